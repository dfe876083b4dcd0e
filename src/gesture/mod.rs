//! Hand-pose gesture pipeline: feature extraction, stretch detection and
//! tracking-session lifecycle.

mod detector;
mod extractor;
mod session;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

#[cfg(test)]
pub use detector::DetectorState;
pub use detector::StretchDetector;
pub use extractor::MotionExtractor;
pub use session::{GestureSession, TrackingSwitch};

use crate::config::GestureConfig;

/// Named anatomical point on a tracked hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Wrist,
    ThumbTip,
    IndexTip,
    MiddleTip,
    RingTip,
    LittleTip,
}

/// A landmark position in normalized image coordinates plus the pose
/// estimator's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl LandmarkPoint {
    #[cfg(test)]
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// Euclidean distance to another point, in normalized units.
    pub fn distance_to(&self, other: &LandmarkPoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One hand detected in one video frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub landmarks: HashMap<Landmark, LandmarkPoint>,
}

impl HandObservation {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style landmark insertion.
    #[cfg(test)]
    pub fn with(mut self, landmark: Landmark, x: f64, y: f64, confidence: f64) -> Self {
        self.landmarks
            .insert(landmark, LandmarkPoint::new(x, y, confidence));
        self
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.landmarks.get(&landmark)
    }
}

/// Scalar motion signal derived from one accepted observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Mean y of the index and middle fingertips. Larger is closer to the screen.
    pub avg_finger_y: f64,
    /// Wrist to index-fingertip distance.
    pub extension: f64,
    pub timestamp: Instant,
}

/// Detection thresholds handed to the extractor and detector at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Landmarks at or below this confidence reject the observation.
    pub confidence: f64,
    /// Minimum per-sample rise of `avg_finger_y` that counts as forward motion.
    pub forward_delta: f64,
    /// Per-sample change below which progress decays. Negative.
    pub decay_delta: f64,
    /// Minimum finger extension for a forward sample to count.
    pub extension: f64,
    /// Consecutive forward samples needed to trigger.
    pub stretch_count: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: 0.3,
            forward_delta: 0.02,
            decay_delta: -0.01,
            extension: 0.15,
            stretch_count: 3,
        }
    }
}

impl From<&GestureConfig> for Thresholds {
    fn from(config: &GestureConfig) -> Self {
        Self {
            confidence: config.confidence_threshold,
            forward_delta: config.forward_delta,
            decay_delta: config.decay_delta,
            extension: config.extension_threshold,
            stretch_count: config.stretch_count,
        }
    }
}

#[cfg(test)]
pub(crate) fn hand(index_y: f64, middle_y: f64, extension: f64) -> HandObservation {
    // Wrist placed straight below the index tip so that the wrist-to-index
    // distance equals `extension`.
    HandObservation::new()
        .with(Landmark::Wrist, 0.5, index_y - extension, 0.9)
        .with(Landmark::IndexTip, 0.5, index_y, 0.9)
        .with(Landmark::MiddleTip, 0.55, middle_y, 0.9)
}
