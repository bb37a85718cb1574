//! Heuristic subject height from a coarse camera prior.
//!
//! This is an approximation, not an inverse-perspective solve. The constants
//! are sport-specific and meant to be tuned per deployment.

use court_calib_core::{CameraPositionConfig, WorldPoint};
use serde::{Deserialize, Serialize};

/// Tunable constants for [`estimate_height`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightModel {
    /// Typical standing height of the tracked subject, meters.
    pub typical_subject_height_m: f64,
    /// Fraction of the stature at which the tracked body center sits.
    pub reference_fraction: f64,
    /// Multiplier for cameras beyond a sideline (`left`/`right`).
    pub sideline_sensitivity: f64,
    /// Multiplier for cameras behind a baseline (`top`/`bottom`). Smaller,
    /// since foreshortening along that view hides most height information.
    pub baseline_sensitivity: f64,
    pub max_height_m: f64,
}

impl Default for HeightModel {
    fn default() -> Self {
        Self {
            typical_subject_height_m: 1.75,
            reference_fraction: 0.55,
            sideline_sensitivity: 1.0,
            baseline_sensitivity: 0.4,
            max_height_m: 2.5,
        }
    }
}

/// Estimated height above the court plane, or `None` without a usable edge.
///
/// `typical height × reference fraction × edge sensitivity × cos(elevation)`,
/// where elevation is the angle at which the camera looks down onto the court
/// edge. Steeper views see less of the subject's vertical extent.
pub fn estimate_height(camera: &CameraPositionConfig, model: &HeightModel) -> Option<f64> {
    let sensitivity = if camera.edge.is_sideline() {
        model.sideline_sensitivity
    } else if camera.edge.is_baseline() {
        model.baseline_sensitivity
    } else {
        return None;
    };

    let (h, d) = (camera.height, camera.distance);
    if !h.is_finite() || !d.is_finite() || h < 0.0 || d < 0.0 || h + d <= 0.0 {
        return None;
    }
    let cos_elevation = d / (h * h + d * d).sqrt();

    let z = model.typical_subject_height_m * model.reference_fraction * sensitivity * cos_elevation;
    Some(z.clamp(0.0, model.max_height_m))
}

/// Move a ground-plane hit toward the camera foot point so that it describes
/// a point at height `z` on the same viewing ray.
///
/// By similar triangles the horizontal offset from the camera shrinks by
/// `1 - z / camera.z`. Returns `ground` unchanged when `z` is not strictly
/// between the plane and the camera.
pub fn correct_parallax(ground: WorldPoint, camera: WorldPoint, z: f64) -> WorldPoint {
    if !(z > 0.0 && camera.z > z) {
        return WorldPoint::new(ground.x, ground.y, z);
    }
    let k = 1.0 - z / camera.z;
    WorldPoint::new(
        camera.x + (ground.x - camera.x) * k,
        camera.y + (ground.y - camera.y) * k,
        z,
    )
}
