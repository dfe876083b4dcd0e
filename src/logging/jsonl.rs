//! JSONL journal of warnings and session lifecycle.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::trigger::TriggerSource;

/// Journal event types, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum JournalEvent {
    #[serde(rename = "session_start")]
    SessionStart {
        timestamp: DateTime<Utc>,
        version: String,
    },
    #[serde(rename = "session_end")]
    SessionEnd {
        timestamp: DateTime<Utc>,
        activations: u64,
    },
    #[serde(rename = "tracking_start")]
    TrackingStart { timestamp: DateTime<Utc> },
    #[serde(rename = "tracking_stop")]
    TrackingStop {
        timestamp: DateTime<Utc>,
        tracked_seconds: u64,
    },
    #[serde(rename = "activation")]
    Activation {
        timestamp: DateTime<Utc>,
        source: TriggerSource,
    },
}

/// Appends journal events to one file per local day.
pub struct JsonlLogger {
    logs_dir: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    tracking_start_time: Option<DateTime<Utc>>,
}

impl JsonlLogger {
    /// Create a new JSONL logger.
    pub fn new(logs_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

        Ok(Self {
            logs_dir,
            current_file: None,
            current_date: None,
            tracking_start_time: None,
        })
    }

    /// Path of the file currently being written, if one is open.
    #[cfg(test)]
    pub fn current_path(&self) -> Option<PathBuf> {
        self.current_date
            .as_ref()
            .map(|date| self.logs_dir.join(format!("{}.jsonl", date)))
    }

    /// Get or create the log file for today.
    fn get_writer(&mut self) -> Result<&mut BufWriter<File>> {
        let today = Local::now().format("%Y-%m-%d").to_string();

        if self.current_date.as_ref() != Some(&today) {
            let log_path = self.logs_dir.join(format!("{}.jsonl", today));

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {:?}", log_path))?;

            self.current_file = Some(BufWriter::new(file));
            self.current_date = Some(today);

            debug!("Opened journal: {:?}", log_path);
        }

        self.current_file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No log file available"))
    }

    fn write_event(&mut self, event: &JournalEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let writer = self.get_writer()?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    pub fn log_session_start(&mut self, version: &str) -> Result<()> {
        info!("Session started");
        self.write_event(&JournalEvent::SessionStart {
            timestamp: Utc::now(),
            version: version.to_string(),
        })
    }

    pub fn log_session_end(&mut self, activations: u64) -> Result<()> {
        info!("Session ended, {} warnings shown", activations);
        self.write_event(&JournalEvent::SessionEnd {
            timestamp: Utc::now(),
            activations,
        })
    }

    pub fn log_tracking_start(&mut self) -> Result<()> {
        let now = Utc::now();
        self.tracking_start_time = Some(now);
        self.write_event(&JournalEvent::TrackingStart { timestamp: now })
    }

    pub fn log_tracking_stop(&mut self) -> Result<()> {
        let tracked_seconds = self
            .tracking_start_time
            .take()
            .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
            .unwrap_or(0);

        self.write_event(&JournalEvent::TrackingStop {
            timestamp: Utc::now(),
            tracked_seconds,
        })
    }

    pub fn log_activation(&mut self, source: TriggerSource, timestamp: DateTime<Utc>) -> Result<()> {
        self.write_event(&JournalEvent::Activation { timestamp, source })
    }
}

impl Drop for JsonlLogger {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.current_file {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_events(logger: &JsonlLogger) -> Vec<serde_json::Value> {
        let content = std::fs::read_to_string(logger.current_path().unwrap()).unwrap();
        content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_event_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = JsonlLogger::new(dir.path().join("logs")).unwrap();
        assert!(logger.current_path().is_none());

        logger.log_session_start("0.1.0").unwrap();
        logger.log_activation(TriggerSource::HotKey, Utc::now()).unwrap();
        logger.log_session_end(1).unwrap();

        let events = read_events(&logger);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "session_start");
        assert_eq!(events[0]["version"], "0.1.0");
        assert_eq!(events[1]["event"], "activation");
        assert_eq!(events[1]["source"], "hot_key");
        assert_eq!(events[2]["activations"], 1);
    }

    #[test]
    fn test_tracking_span() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = JsonlLogger::new(dir.path().to_path_buf()).unwrap();

        logger.log_tracking_start().unwrap();
        logger.log_tracking_stop().unwrap();
        // Stop without a matching start reports zero.
        logger.log_tracking_stop().unwrap();

        let events = read_events(&logger);
        assert_eq!(events[0]["event"], "tracking_start");
        assert_eq!(events[1]["event"], "tracking_stop");
        assert_eq!(events[2]["tracked_seconds"], 0);
    }
}
