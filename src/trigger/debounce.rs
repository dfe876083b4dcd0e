//! Cooldown gate shared by every trigger source.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Accepts at most one trigger per cooldown window.
///
/// The check and the update of the last activation time happen under one
/// lock, so two concurrent candidates can never both pass.
pub struct Debouncer {
    cooldown: Duration,
    last_activation: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_activation: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Accept or drop a trigger happening now. Returns the activation time
    /// when the trigger is effective.
    ///
    /// The clock is read inside the critical section, so the time compared
    /// against the cooldown is the time of the check, never a producer-side
    /// stamp that may have waited in a queue.
    pub fn accept(&self) -> Option<Instant> {
        self.accept_with(Instant::now)
    }

    /// Accept or drop a trigger occurring at `now`.
    ///
    /// A `now` earlier than the last activation counts as zero elapsed time.
    #[cfg(test)]
    pub fn accept_at(&self, now: Instant) -> bool {
        self.accept_with(|| now).is_some()
    }

    /// Run the check-and-set under the lock, reading the time from `clock`.
    /// Returns the activation time when the trigger is effective.
    pub fn accept_with(&self, clock: impl FnOnce() -> Instant) -> Option<Instant> {
        // A poisoned lock still holds a valid timestamp.
        let mut last = self
            .last_activation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = clock();
        let effective = match *last {
            Some(prev) => now.saturating_duration_since(prev) >= self.cooldown,
            None => true,
        };
        if effective {
            *last = Some(now);
            Some(now)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn last_activation(&self) -> Option<Instant> {
        *self
            .last_activation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const COOLDOWN: Duration = Duration::from_millis(300);

    #[test]
    fn test_first_trigger_accepted() {
        let debouncer = Debouncer::new(COOLDOWN);
        assert!(debouncer.last_activation().is_none());
        assert!(debouncer.accept_at(Instant::now()));
        assert!(debouncer.last_activation().is_some());
    }

    #[test]
    fn test_hot_key_cooldown_window() {
        let debouncer = Debouncer::new(COOLDOWN);
        let t0 = Instant::now();
        let third = t0 + Duration::from_millis(350);

        assert!(debouncer.accept_at(t0));
        assert!(!debouncer.accept_at(t0 + Duration::from_millis(100)));
        assert!(debouncer.accept_at(third));
        assert_eq!(debouncer.last_activation(), Some(third));
    }

    #[test]
    fn test_accept_uses_time_of_check() {
        let debouncer = Debouncer::new(COOLDOWN);
        let before = Instant::now();
        let accepted = debouncer.accept().unwrap();
        assert!(accepted >= before);
        assert!(debouncer.accept().is_none());
        assert_eq!(debouncer.last_activation(), Some(accepted));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let debouncer = Debouncer::new(COOLDOWN);
        let t0 = Instant::now();
        assert!(debouncer.accept_at(t0));
        assert!(!debouncer.accept_at(t0 + Duration::from_millis(250)));
        assert!(debouncer.accept_at(t0 + COOLDOWN));
    }

    #[test]
    fn test_out_of_order_timestamp_rejected() {
        let debouncer = Debouncer::new(COOLDOWN);
        let t0 = Instant::now();
        assert!(debouncer.accept_at(t0 + Duration::from_secs(1)));
        assert!(!debouncer.accept_at(t0));
    }

    #[test]
    fn test_concurrent_candidates_only_one_passes() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_secs(60)));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let debouncer = debouncer.clone();
                thread::spawn(move || (0..100).filter(|_| debouncer.accept_at(now)).count())
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 1);
    }
}
