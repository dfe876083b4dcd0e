//! Camera boundary: per-frame hand observations enter the gesture pipeline here.
//!
//! Frames are handed over through a latest-only slot. A frame that has not
//! been picked up yet is replaced by the next one, so the gesture side always
//! works on the most recent frame and never on a backlog.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::gesture::HandObservation;

/// Gesture-side end of the frame slot.
pub type FrameReceiver = watch::Receiver<Option<HandObservation>>;

/// Camera-side end of the frame slot.
pub struct FramePublisher {
    tx: watch::Sender<Option<HandObservation>>,
}

impl FramePublisher {
    /// Publish the newest frame, replacing any unread one. Returns `false`
    /// once the gesture side has gone away.
    pub fn publish(&self, frame: Option<HandObservation>) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Create a latest-only frame slot.
pub fn frame_slot() -> (FramePublisher, FrameReceiver) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher { tx }, rx)
}

/// Parse one replay line. Blank lines and `null` mean "no hand in this frame".
pub fn parse_frame(line: &str) -> serde_json::Result<Option<HandObservation>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
}

/// Plays back recorded observations from a JSONL file at a fixed frame rate.
pub struct ReplaySource {
    frame_interval: Duration,
}

impl ReplaySource {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }

    /// Publish every frame in `path`. Returns the number of frames played.
    pub async fn play(&self, path: &Path, publisher: &FramePublisher) -> Result<u64> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open replay file: {:?}", path))?;
        let mut lines = BufReader::new(file).lines();
        let mut interval = tokio::time::interval(self.frame_interval);
        let mut frames: u64 = 0;
        let mut line_no: u64 = 0;

        info!("Replaying hand observations from {:?}", path);

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let frame = match parse_frame(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping malformed frame at line {}: {}", line_no, e);
                    continue;
                }
            };

            interval.tick().await;
            if !publisher.publish(frame) {
                debug!("Gesture pipeline gone, ending replay");
                break;
            }
            frames += 1;
        }

        info!("Replay finished after {} frames", frames);
        Ok(frames)
    }
}
