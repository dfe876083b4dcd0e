//! Counting-hysteresis detector for the "reach toward the screen" motion.
//!
//! A trigger needs `stretch_count` forward samples in a row, where a sample is
//! forward when `avg_finger_y` rose by more than `forward_delta` since the
//! previous sample and the fingers are extended past `extension`. A sample
//! that falls by more than `decay_delta` takes one step of progress back;
//! anything in between holds. Missing samples never reach the detector, so
//! brief occlusion keeps partial progress.

use tracing::debug;

use super::{MotionSample, Thresholds};
use crate::trigger::{TriggerCandidate, TriggerSource};

/// Mutable detector state, reset to zero when tracking (re)starts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectorState {
    pub previous_finger_tip_y: f64,
    pub consecutive_forward_count: u32,
}

pub struct StretchDetector {
    thresholds: Thresholds,
    state: DetectorState,
}

impl StretchDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: DetectorState::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = DetectorState::default();
    }

    /// Feed one sample. Returns a gesture candidate when the forward count
    /// reaches the threshold.
    pub fn process(&mut self, sample: &MotionSample) -> Option<TriggerCandidate> {
        let t = &self.thresholds;
        let delta = sample.avg_finger_y - self.state.previous_finger_tip_y;
        let mut candidate = None;

        if delta > t.forward_delta && sample.extension > t.extension {
            self.state.consecutive_forward_count += 1;
            if self.state.consecutive_forward_count >= t.stretch_count {
                debug!(
                    "Stretch detected (delta={:.3}, extension={:.3})",
                    delta, sample.extension
                );
                candidate = Some(TriggerCandidate::new(TriggerSource::Gesture, sample.timestamp));
                self.state.consecutive_forward_count = 0;
            }
        } else if delta < t.decay_delta {
            self.state.consecutive_forward_count = self.state.consecutive_forward_count.saturating_sub(1);
        }

        self.state.previous_finger_tip_y = sample.avg_finger_y;
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sample(y: f64, extension: f64) -> MotionSample {
        MotionSample {
            avg_finger_y: y,
            extension,
            timestamp: Instant::now(),
        }
    }

    fn detector() -> StretchDetector {
        StretchDetector::new(Thresholds::default())
    }

    #[test]
    fn test_three_forward_samples_trigger_once() {
        let mut d = detector();
        assert!(d.process(&sample(0.10, 0.20)).is_none());
        assert!(d.process(&sample(0.13, 0.20)).is_none());
        let candidate = d.process(&sample(0.16, 0.20)).unwrap();
        assert_eq!(candidate.source, TriggerSource::Gesture);
        assert_eq!(d.state().consecutive_forward_count, 0);
        assert_eq!(d.state().previous_finger_tip_y, 0.16);
    }

    #[test]
    fn test_backward_sample_decays_progress() {
        let mut d = detector();
        // Baseline sample: large delta but fingers not extended, so it holds.
        assert!(d.process(&sample(0.10, 0.05)).is_none());
        assert_eq!(d.state().consecutive_forward_count, 0);

        assert!(d.process(&sample(0.13, 0.20)).is_none());
        assert!(d.process(&sample(0.16, 0.20)).is_none());
        assert_eq!(d.state().consecutive_forward_count, 2);

        assert!(d.process(&sample(0.14, 0.20)).is_none());
        assert_eq!(d.state().consecutive_forward_count, 1);
    }

    #[test]
    fn test_hold_leaves_count_unchanged() {
        let mut d = detector();
        d.process(&sample(0.10, 0.20));
        assert_eq!(d.state().consecutive_forward_count, 1);
        // Within [-0.01, 0.02]
        d.process(&sample(0.11, 0.20));
        d.process(&sample(0.105, 0.20));
        assert_eq!(d.state().consecutive_forward_count, 1);
        assert_eq!(d.state().previous_finger_tip_y, 0.105);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut d = detector();
        for y in [0.9, 0.8, 0.7, 0.6] {
            d.process(&sample(y, 0.20));
        }
        // First sample counted forward from the zero baseline, then decayed.
        assert_eq!(d.state().consecutive_forward_count, 0);
    }

    #[test]
    fn test_count_stays_below_threshold() {
        let mut d = detector();
        let mut y: f64 = 0.0;
        let mut triggers = 0;
        // Deterministic zig-zag walk covering forward, hold and backward steps.
        let steps = [0.03, 0.05, -0.02, 0.03, 0.0, 0.04, 0.03, -0.05, 0.01, 0.03, 0.03, 0.03];
        for (i, step) in steps.iter().cycle().take(120).enumerate() {
            y += step;
            let extension = if i % 7 == 0 { 0.1 } else { 0.3 };
            if d.process(&sample(y, extension)).is_some() {
                triggers += 1;
                assert_eq!(d.state().consecutive_forward_count, 0);
            }
            assert!(d.state().consecutive_forward_count < 3);
        }
        assert!(triggers > 0);
    }

    #[test]
    fn test_reset() {
        let mut d = detector();
        d.process(&sample(0.10, 0.20));
        d.reset();
        assert_eq!(d.state(), DetectorState::default());
    }

    #[test]
    fn test_custom_thresholds() {
        let mut d = StretchDetector::new(Thresholds {
            stretch_count: 1,
            ..Thresholds::default()
        });
        assert!(d.process(&sample(0.10, 0.20)).is_some());
    }
}
