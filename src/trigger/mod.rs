//! Trigger fan-in: candidates from the hot key and the gesture detector are
//! coalesced into rate-limited activation signals.

mod arbiter;
mod debounce;

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use arbiter::{TriggerArbiter, TriggerSender};
pub use debounce::Debouncer;

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    HotKey,
    Gesture,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HotKey => write!(f, "hot key"),
            Self::Gesture => write!(f, "gesture"),
        }
    }
}

/// A raw, not yet debounced trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerCandidate {
    pub source: TriggerSource,
    pub timestamp: Instant,
}

impl TriggerCandidate {
    pub fn new(source: TriggerSource, timestamp: Instant) -> Self {
        Self { source, timestamp }
    }

    pub fn now(source: TriggerSource) -> Self {
        Self::new(source, Instant::now())
    }
}

/// An accepted trigger, delivered to presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationSignal {
    pub timestamp: Instant,
    /// Source of the winning candidate. Informational only.
    pub source: TriggerSource,
}
