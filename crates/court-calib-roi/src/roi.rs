//! Normalized regions of interest.

use court_calib_core::{ImagePoint, PoseLandmark};
use serde::{Deserialize, Serialize};

/// Smallest width/height of a validated ROI, as a fraction of the frame.
pub const MIN_ROI_EXTENT: f64 = 0.05;

/// Region in normalized `[0, 1]` frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Roi {
    fn default() -> Self {
        Self::full()
    }
}

impl Roi {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn is_full(&self) -> bool {
        self.x <= 0.0 && self.y <= 0.0 && self.width >= 1.0 && self.height >= 1.0
    }

    pub fn center(&self) -> ImagePoint {
        ImagePoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: ImagePoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Grow (or shrink) about the center by `factor`, then validate.
    pub fn scaled(&self, factor: f64) -> Self {
        let c = self.center();
        let w = self.width * factor;
        let h = self.height * factor;
        validate_roi(Self::new(c.x - w / 2.0, c.y - h / 2.0, w, h))
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Clamp `roi` into a usable box. Total and idempotent.
///
/// Non-finite origins become `0`, non-finite extents become the full frame.
/// The origin is clamped so that a minimum-size box still fits, then the
/// extents are clamped to `[MIN_ROI_EXTENT, 1 - origin]`.
pub fn validate_roi(roi: Roi) -> Roi {
    let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
    let max_origin = 1.0 - MIN_ROI_EXTENT;

    let x = finite_or(roi.x, 0.0).clamp(0.0, max_origin);
    let y = finite_or(roi.y, 0.0).clamp(0.0, max_origin);
    let width = finite_or(roi.width, 1.0).clamp(MIN_ROI_EXTENT, 1.0 - x);
    let height = finite_or(roi.height, 1.0).clamp(MIN_ROI_EXTENT, 1.0 - y);

    Roi {
        x,
        y,
        width,
        height,
    }
}

/// Fraction of visible landmarks that lie inside `roi`; `0` when none is
/// visible.
pub fn calculate_roi_coverage(landmarks: &[PoseLandmark], roi: &Roi) -> f64 {
    let (visible, inside) = landmarks
        .iter()
        .filter(|lm| lm.is_visible())
        .fold((0usize, 0usize), |(v, i), lm| {
            (v + 1, i + usize::from(roi.contains(lm.position())))
        });
    if visible == 0 {
        0.0
    } else {
        inside as f64 / visible as f64
    }
}

/// Bounding box of the visible landmarks, padded about its center and
/// validated. `None` with fewer than `min_visible` visible landmarks.
pub fn roi_from_landmarks(landmarks: &[PoseLandmark], min_visible: usize, padding: f64) -> Option<Roi> {
    let mut min = ImagePoint::new(f64::MAX, f64::MAX);
    let mut max = ImagePoint::new(f64::MIN, f64::MIN);
    let mut count = 0usize;

    for lm in landmarks.iter().filter(|lm| lm.is_visible()) {
        if !(lm.x.is_finite() && lm.y.is_finite()) {
            continue;
        }
        min.x = min.x.min(lm.x);
        min.y = min.y.min(lm.y);
        max.x = max.x.max(lm.x);
        max.y = max.y.max(lm.y);
        count += 1;
    }
    if count < min_visible.max(1) {
        return None;
    }

    let bbox = Roi::new(min.x, min.y, max.x - min.x, max.y - min.y);
    Some(bbox.scaled(padding))
}
