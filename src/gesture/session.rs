//! Tracking session: owns the detector state for as long as tracking runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::{HandObservation, MotionExtractor, MotionSample, StretchDetector, Thresholds};
use crate::camera::FrameReceiver;
use crate::trigger::{TriggerCandidate, TriggerSender};

struct SwitchState {
    active: AtomicBool,
    /// Bumped on every start and stop.
    generation: AtomicU64,
}

/// Cross-thread start/stop control for a [`GestureSession`].
#[derive(Clone)]
pub struct TrackingSwitch {
    inner: Arc<SwitchState>,
}

impl TrackingSwitch {
    /// A switch in the stopped position.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SwitchState {
                active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn start(&self) {
        if !self.inner.active.swap(true, Ordering::SeqCst) {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            info!("Hand tracking started");
        }
    }

    pub fn stop(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            info!("Hand tracking stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl Default for TrackingSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the extractor and stretch detector over the frames of one camera.
///
/// Every start or stop of the switch clears the detector, and a sample
/// extracted under an older switch generation is dropped rather than fed to
/// the detector.
pub struct GestureSession {
    extractor: MotionExtractor,
    detector: StretchDetector,
    switch: TrackingSwitch,
    seen_generation: u64,
}

impl GestureSession {
    pub fn new(thresholds: Thresholds, switch: TrackingSwitch) -> Self {
        let seen_generation = switch.generation();
        Self {
            extractor: MotionExtractor::new(thresholds.confidence),
            detector: StretchDetector::new(thresholds),
            switch,
            seen_generation,
        }
    }

    #[cfg(test)]
    pub fn switch(&self) -> &TrackingSwitch {
        &self.switch
    }

    pub fn start(&mut self) {
        self.switch.start();
        self.sync();
    }

    /// Stop tracking. Detector state is cleared before this returns.
    pub fn stop(&mut self) {
        self.switch.stop();
        self.sync();
    }

    #[cfg(test)]
    pub fn state(&self) -> super::DetectorState {
        self.detector.state()
    }

    /// Process one frame. `None` means no hand was detected.
    pub fn process(&mut self, frame: Option<&HandObservation>) -> Option<TriggerCandidate> {
        self.sync();
        if !self.switch.is_active() {
            return None;
        }

        let generation = self.seen_generation;
        let sample = self.extractor.extract(frame?)?;
        self.apply(generation, &sample)
    }

    /// Feed a sample extracted under `generation` to the detector.
    ///
    /// The generation is checked after the detector step, so a stop that
    /// lands at any point before then resets the detector and drops the
    /// candidate.
    fn apply(&mut self, generation: u64, sample: &MotionSample) -> Option<TriggerCandidate> {
        let candidate = self.detector.process(sample);
        if self.switch.generation() != generation {
            debug!("Discarding sample from a stopped tracking session");
            self.sync();
            return None;
        }
        candidate
    }

    /// Consume frames until the camera side goes away, forwarding gesture
    /// candidates to the arbiter intake.
    pub async fn run(mut self, mut frames: FrameReceiver, intake: TriggerSender) {
        while frames.changed().await.is_ok() {
            let frame = frames.borrow_and_update().clone();
            if let Some(candidate) = self.process(frame.as_ref()) {
                if intake.send(candidate).is_err() {
                    debug!("Trigger intake closed, stopping gesture session");
                    break;
                }
            }
        }
        self.stop();
        debug!("Gesture session finished");
    }

    fn sync(&mut self) {
        let generation = self.switch.generation();
        if generation != self.seen_generation {
            self.detector.reset();
            self.seen_generation = generation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera;
    use crate::gesture::{hand, DetectorState, Landmark};
    use crate::trigger::{TriggerArbiter, TriggerSource};
    use std::time::{Duration, Instant};

    fn session() -> GestureSession {
        let mut session = GestureSession::new(Thresholds::default(), TrackingSwitch::new());
        session.start();
        session
    }

    #[test]
    fn test_inactive_session_ignores_frames() {
        let mut session = GestureSession::new(Thresholds::default(), TrackingSwitch::new());
        for y in [0.10, 0.13, 0.16, 0.19] {
            assert!(session.process(Some(&hand(y, y, 0.2))).is_none());
        }
        assert_eq!(session.state(), DetectorState::default());
    }

    #[test]
    fn test_reach_triggers_gesture() {
        let mut session = session();
        assert!(session.process(Some(&hand(0.10, 0.10, 0.2))).is_none());
        assert!(session.process(Some(&hand(0.13, 0.13, 0.2))).is_none());
        let candidate = session.process(Some(&hand(0.16, 0.16, 0.2))).unwrap();
        assert_eq!(candidate.source, TriggerSource::Gesture);
    }

    #[test]
    fn test_missing_frames_never_trigger() {
        let mut session = session();
        for _ in 0..100 {
            assert!(session.process(None).is_none());
        }
        assert_eq!(session.state(), DetectorState::default());
    }

    #[test]
    fn test_low_confidence_frame_leaves_state_untouched() {
        let mut session = session();
        session.process(Some(&hand(0.10, 0.10, 0.2)));
        let before = session.state();

        let occluded = hand(0.50, 0.50, 0.2).with(Landmark::IndexTip, 0.5, 0.5, 0.2);
        assert!(session.process(Some(&occluded)).is_none());
        assert_eq!(session.state(), before);
        assert_eq!(session.state().previous_finger_tip_y, 0.10);
    }

    #[test]
    fn test_occlusion_keeps_partial_progress() {
        let mut session = session();
        session.process(Some(&hand(0.10, 0.10, 0.2)));
        session.process(Some(&hand(0.13, 0.13, 0.2)));
        session.process(None);
        session.process(None);
        assert!(session.process(Some(&hand(0.16, 0.16, 0.2))).is_some());
    }

    #[test]
    fn test_stop_clears_state() {
        let mut session = session();
        session.process(Some(&hand(0.10, 0.10, 0.2)));
        session.process(Some(&hand(0.13, 0.13, 0.2)));
        assert_eq!(session.state().consecutive_forward_count, 2);

        session.stop();
        assert_eq!(session.state(), DetectorState::default());
        assert!(session.process(Some(&hand(0.16, 0.16, 0.2))).is_none());

        // Restarting begins from scratch: one more forward frame is not enough.
        session.start();
        assert!(session.process(Some(&hand(0.19, 0.19, 0.2))).is_none());
        assert_eq!(session.state().consecutive_forward_count, 1);
    }

    #[test]
    fn test_remote_stop_resets_on_next_frame() {
        let mut session = session();
        let remote = session.switch().clone();
        session.process(Some(&hand(0.10, 0.10, 0.2)));
        session.process(Some(&hand(0.13, 0.13, 0.2)));

        remote.stop();
        remote.start();
        assert!(session.process(Some(&hand(0.16, 0.16, 0.2))).is_none());
        assert_eq!(session.state().consecutive_forward_count, 1);
    }

    #[test]
    fn test_stop_during_detector_step_drops_candidate() {
        let mut session = session();
        let remote = session.switch().clone();
        session.process(Some(&hand(0.10, 0.10, 0.2)));
        session.process(Some(&hand(0.13, 0.13, 0.2)));

        // Sample extracted before the stop, applied after it.
        let generation = session.seen_generation;
        let sample = MotionSample {
            avg_finger_y: 0.16,
            extension: 0.2,
            timestamp: Instant::now(),
        };
        remote.stop();
        remote.start();

        assert!(session.apply(generation, &sample).is_none());
        assert_eq!(session.state(), DetectorState::default());
        assert_eq!(session.seen_generation, remote.generation());
    }

    #[tokio::test]
    async fn test_run_forwards_candidates() {
        let thresholds = Thresholds {
            stretch_count: 1,
            ..Thresholds::default()
        };
        let mut session = GestureSession::new(thresholds, TrackingSwitch::new());
        session.start();

        let (publisher, frames) = camera::frame_slot();
        let (tx, mut rx) = TriggerArbiter::intake();
        let task = tokio::spawn(session.run(frames, tx));

        publisher.publish(Some(hand(0.4, 0.4, 0.3)));
        let candidate = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(candidate.source, TriggerSource::Gesture);

        drop(publisher);
        task.await.unwrap();
    }
}
