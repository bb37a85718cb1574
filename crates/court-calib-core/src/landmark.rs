use serde::{Deserialize, Serialize};

use crate::geometry::{FrameSize, ImagePoint};

/// Landmarks at or below this visibility are ignored for tracking decisions.
pub const VISIBILITY_THRESHOLD: f64 = 0.3;

/// One keypoint as reported by a pose model.
///
/// `x`/`y` are normalized to whatever image region the model was given (a
/// crop, or the full frame after remapping). `z` is the model's own relative
/// depth and has no metric meaning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl PoseLandmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visibility > VISIBILITY_THRESHOLD
    }

    #[inline]
    pub fn position(&self) -> ImagePoint {
        ImagePoint::new(self.x, self.y)
    }

    /// The same landmark with `x`/`y` scaled into pixels of `frame`.
    pub fn to_pixels(&self, frame: FrameSize) -> Self {
        let p = frame.to_pixels(self.position());
        Self {
            x: p.x,
            y: p.y,
            ..*self
        }
    }
}

/// A model-space 3-D landmark (the pose model's own metric-free frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelWorldLandmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_threshold_is_exclusive() {
        assert!(!PoseLandmark::new(0.5, 0.5, 0.0, 0.3).is_visible());
        assert!(PoseLandmark::new(0.5, 0.5, 0.0, 0.31).is_visible());
    }

    #[test]
    fn to_pixels_keeps_depth_and_visibility() {
        let lm = PoseLandmark::new(0.5, 0.25, -0.2, 0.9);
        let px = lm.to_pixels(FrameSize::new(640, 480));
        assert_eq!(px, PoseLandmark::new(320.0, 120.0, -0.2, 0.9));
    }

    #[test]
    fn missing_fields_default() {
        let lm: PoseLandmark = serde_json::from_str(r#"{"x":0.1,"y":0.2}"#).expect("parse");
        assert_eq!(lm.z, 0.0);
        assert_eq!(lm.visibility, 0.0);
    }
}
