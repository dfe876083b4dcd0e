//! Presentation side of the activation channel.
//!
//! Showing the actual warning surface is platform UI work; this module only
//! defines the boundary and a presenter that announces the warning and
//! journals it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};

use crate::config::PopupConfig;
use crate::logging::JsonlLogger;
use crate::trigger::ActivationSignal;

/// Receives accepted activations. Called from whichever thread submitted the
/// winning candidate, so implementations must be thread safe.
pub trait Presenter: Send + Sync {
    fn on_activate(&self, signal: &ActivationSignal);
}

/// Announces the configured warning and records each activation.
pub struct WarningPresenter {
    popup: PopupConfig,
    journal: Option<Arc<Mutex<JsonlLogger>>>,
    shown: AtomicU64,
}

impl WarningPresenter {
    pub fn new(popup: PopupConfig, journal: Option<Arc<Mutex<JsonlLogger>>>) -> Self {
        Self {
            popup,
            journal,
            shown: AtomicU64::new(0),
        }
    }

    /// Number of warnings shown.
    pub fn shown(&self) -> u64 {
        self.shown.load(Ordering::SeqCst)
    }
}

impl Presenter for WarningPresenter {
    fn on_activate(&self, signal: &ActivationSignal) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        info!("⚠️  {} [{}]", self.popup.text, self.popup.color);

        if let Some(journal) = &self.journal {
            let mut journal = journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = journal.log_activation(signal.source, Utc::now()) {
                warn!("Failed to journal activation: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerSource;
    use std::time::Instant;

    fn signal() -> ActivationSignal {
        ActivationSignal {
            timestamp: Instant::now(),
            source: TriggerSource::Gesture,
        }
    }

    #[test]
    fn test_counts_warnings() {
        let presenter = WarningPresenter::new(PopupConfig::default(), None);
        presenter.on_activate(&signal());
        presenter.on_activate(&signal());
        assert_eq!(presenter.shown(), 2);
    }

    #[test]
    fn test_journals_activation() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Mutex::new(JsonlLogger::new(dir.path().to_path_buf()).unwrap()));
        let presenter = WarningPresenter::new(PopupConfig::default(), Some(journal.clone()));

        presenter.on_activate(&signal());
        drop(presenter);

        let path = journal.lock().unwrap().current_path().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains(r#""event":"activation""#));
        assert!(content.contains(r#""source":"gesture""#));
    }
}
