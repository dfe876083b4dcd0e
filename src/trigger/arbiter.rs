//! Single intake point for trigger candidates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::{ActivationSignal, Debouncer, TriggerCandidate};
use crate::presentation::Presenter;

/// Producer half of the arbiter intake. Cheap to clone, one per source.
pub type TriggerSender = mpsc::UnboundedSender<TriggerCandidate>;
/// Consumer half of the arbiter intake, drained by [`TriggerArbiter::run`].
pub type TriggerReceiver = mpsc::UnboundedReceiver<TriggerCandidate>;

/// Merges candidates from every source, debounces them and notifies the
/// presenter once per accepted activation.
///
/// Candidates are coalesced purely on time; the source never affects whether
/// a candidate is accepted.
pub struct TriggerArbiter {
    debouncer: Debouncer,
    presenter: Arc<dyn Presenter>,
    activations: AtomicU64,
}

impl TriggerArbiter {
    pub fn new(cooldown: Duration, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            debouncer: Debouncer::new(cooldown),
            presenter,
            activations: AtomicU64::new(0),
        }
    }

    /// Create the message channel producers send candidates into.
    pub fn intake() -> (TriggerSender, TriggerReceiver) {
        mpsc::unbounded_channel()
    }

    /// Submit a candidate. Safe to call from any thread.
    ///
    /// Returns `true` if the candidate produced an activation. Rejected
    /// candidates have no side effects.
    pub fn submit(&self, candidate: TriggerCandidate) -> bool {
        self.activate(candidate, self.debouncer.accept())
    }

    /// Submit with the debounce clock pinned to `now`.
    #[cfg(test)]
    fn submit_at(&self, candidate: TriggerCandidate, now: Instant) -> bool {
        self.activate(candidate, self.debouncer.accept_with(|| now))
    }

    fn activate(&self, candidate: TriggerCandidate, accepted_at: Option<Instant>) -> bool {
        let Some(timestamp) = accepted_at else {
            trace!("Dropped {} trigger inside cooldown", candidate.source);
            return false;
        };

        let signal = ActivationSignal {
            timestamp,
            source: candidate.source,
        };
        let total = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Candidate waited {:?} before acceptance",
            timestamp.saturating_duration_since(candidate.timestamp)
        );
        info!("Activation #{} ({})", total, signal.source);
        self.presenter.on_activate(&signal);
        true
    }

    /// Drain the intake until every sender has been dropped.
    pub async fn run(&self, mut rx: TriggerReceiver) {
        debug!("Trigger arbiter running (cooldown {:?})", self.debouncer.cooldown());
        while let Some(candidate) = rx.recv().await {
            self.submit(candidate);
        }
        debug!("Trigger intake closed");
    }

    /// Number of activations delivered so far.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::SeqCst)
    }
}
