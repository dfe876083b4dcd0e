//! Reduces a hand observation to a `MotionSample`.

use std::time::Instant;

use super::{HandObservation, Landmark, LandmarkPoint, MotionSample};

/// Confidence-gated feature extractor. Holds only its gate, no per-frame state.
#[derive(Debug, Clone, Copy)]
pub struct MotionExtractor {
    min_confidence: f64,
}

impl MotionExtractor {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    /// Extract a sample stamped with the current time.
    pub fn extract(&self, observation: &HandObservation) -> Option<MotionSample> {
        self.extract_at(observation, Instant::now())
    }

    /// Extract a sample, or `None` if any required landmark is missing or
    /// not confident enough.
    pub fn extract_at(&self, observation: &HandObservation, timestamp: Instant) -> Option<MotionSample> {
        let wrist = self.confident(observation, Landmark::Wrist)?;
        let index_tip = self.confident(observation, Landmark::IndexTip)?;
        let middle_tip = self.confident(observation, Landmark::MiddleTip)?;

        Some(MotionSample {
            avg_finger_y: (index_tip.y + middle_tip.y) / 2.0,
            extension: wrist.distance_to(index_tip),
            timestamp,
        })
    }

    fn confident<'a>(&self, observation: &'a HandObservation, landmark: Landmark) -> Option<&'a LandmarkPoint> {
        observation
            .get(landmark)
            .filter(|point| point.confidence > self.min_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_hand() -> HandObservation {
        HandObservation::new()
            .with(Landmark::Wrist, 0.2, 0.1, 0.9)
            .with(Landmark::IndexTip, 0.5, 0.5, 0.9)
            .with(Landmark::MiddleTip, 0.55, 0.3, 0.9)
    }

    #[test]
    fn test_extracts_signal() {
        let sample = MotionExtractor::new(0.3).extract(&full_hand()).unwrap();
        assert!((sample.avg_finger_y - 0.4).abs() < 1e-12);
        assert!((sample.extension - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_low_confidence_index_tip_is_skipped() {
        let obs = full_hand().with(Landmark::IndexTip, 0.5, 0.5, 0.2);
        assert!(MotionExtractor::new(0.3).extract(&obs).is_none());
    }

    #[test]
    fn test_gate_is_strict() {
        let obs = full_hand().with(Landmark::Wrist, 0.2, 0.1, 0.3);
        assert!(MotionExtractor::new(0.3).extract(&obs).is_none());
    }

    #[test]
    fn test_missing_landmark_is_skipped() {
        let mut obs = full_hand();
        obs.landmarks.remove(&Landmark::MiddleTip);
        assert!(MotionExtractor::new(0.3).extract(&obs).is_none());
        assert!(MotionExtractor::new(0.3).extract(&HandObservation::new()).is_none());
    }

    #[test]
    fn test_extra_landmarks_ignored() {
        let obs = full_hand().with(Landmark::ThumbTip, 0.0, 0.0, 0.0);
        assert!(MotionExtractor::new(0.3).extract(&obs).is_some());
    }
}
