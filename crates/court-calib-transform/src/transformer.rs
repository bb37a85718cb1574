//! Image ↔ court coordinate transforms.
//!
//! The free functions are pure in `(Homography, inputs)` and invert `H` on
//! every call (once per call for the batch variants). [`CoordinateTransformer`]
//! owns the active homography and memoizes its inverse; replacing the
//! homography invalidates that cache.

use court_calib_core::{
    apply_matrix, matrix, CacheStats, CameraPositionConfig, Homography, ImagePoint, InverseCache,
    Mat3, PoseLandmark, WorldPoint, SINGULAR_EPS,
};
use court_calib_homography::CourtDimensions;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::height::{correct_parallax, estimate_height, HeightModel};

/// World meters per unit of the pose model's relative depth.
pub const DEFAULT_DEPTH_SCALE: f64 = 0.5;

/// Settings for the camera-aware parts of the transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    #[serde(default)]
    pub height: HeightModel,
    /// Used to place the camera from its edge/distance prior.
    #[serde(default)]
    pub court: CourtDimensions,
    /// Shift points above the plane toward the camera foot point by similar
    /// triangles. Off by default: `x`/`y` are then exactly the ground-plane
    /// hit of `H⁻¹` and only `z` depends on the camera prior.
    #[serde(default)]
    pub parallax_correction: bool,
}

/// A pose landmark mapped into court space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldLandmark {
    /// `None` when the landmark maps to infinity.
    pub position: Option<WorldPoint>,
    pub visibility: f64,
}

/// Structural and numerical validity of a homography.
///
/// Requires finite cells, `|det| >= 1e-10` and a usable `H[2][2]`.
pub fn is_valid_homography(h: &Homography) -> bool {
    if !matrix::is_finite(&h.h) {
        return false;
    }
    let h22 = h.h[(2, 2)];
    if h22.abs() < SINGULAR_EPS {
        return false;
    }
    matrix::invert(&h.h).is_some()
}

/// Forward projection of the court-plane position of `point`.
pub fn world_to_image(point: &WorldPoint, h: &Homography) -> Option<ImagePoint> {
    h.apply(point.xy())
}

/// Map an image point onto the court.
///
/// `z` is the height to report; when `None` and `camera` names a known edge,
/// it is estimated with the default [`HeightModel`]. Returns `None` when the
/// homography is singular or the point maps to infinity.
pub fn image_to_world(
    point: ImagePoint,
    h: &Homography,
    z: Option<f64>,
    camera: Option<&CameraPositionConfig>,
) -> Option<WorldPoint> {
    let inv = matrix::invert(&h.h)?;
    image_to_world_with_inverse(point, &inv, z, camera, &TransformOptions::default())
}

/// [`image_to_world`] with a precomputed inverse and explicit options.
pub fn image_to_world_with_inverse(
    point: ImagePoint,
    inverse: &Mat3,
    z: Option<f64>,
    camera: Option<&CameraPositionConfig>,
    options: &TransformOptions,
) -> Option<WorldPoint> {
    let ground = apply_matrix(inverse, point)?;
    let z = match (z, camera) {
        (Some(z), _) => z,
        (None, Some(cam)) => estimate_height(cam, &options.height).unwrap_or(0.0),
        (None, None) => 0.0,
    };
    let ground = WorldPoint::new(ground.x, ground.y, 0.0);

    let camera_pos = camera
        .filter(|_| options.parallax_correction)
        .and_then(|c| c.resolve_position(options.court.half_width(), options.court.half_length()));
    Some(match camera_pos {
        Some(pos) => correct_parallax(ground, pos, z),
        None => WorldPoint::new(ground.x, ground.y, z),
    })
}

/// Map many image points at height `z` with a single inversion.
pub fn batch_image_to_world(points: &[ImagePoint], h: &Homography, z: f64) -> Vec<Option<WorldPoint>> {
    match matrix::invert(&h.h) {
        Some(inv) => batch_with_inverse(points, &inv, z),
        None => vec![None; points.len()],
    }
}

fn batch_with_inverse(points: &[ImagePoint], inv: &Mat3, z: f64) -> Vec<Option<WorldPoint>> {
    points
        .iter()
        .map(|p| apply_matrix(inv, *p).map(|g| WorldPoint::new(g.x, g.y, z)))
        .collect()
}

/// Map pose landmarks (in the image units `h` produces) onto the court.
///
/// Visibility is kept. The model's relative depth is not discarded: it is
/// added to `world_z` scaled by [`DEFAULT_DEPTH_SCALE`].
pub fn transform_pose_landmarks(
    landmarks: &[PoseLandmark],
    h: &Homography,
    world_z: f64,
) -> Vec<WorldLandmark> {
    transform_pose_landmarks_scaled(landmarks, h, world_z, DEFAULT_DEPTH_SCALE)
}

pub fn transform_pose_landmarks_scaled(
    landmarks: &[PoseLandmark],
    h: &Homography,
    world_z: f64,
    depth_scale: f64,
) -> Vec<WorldLandmark> {
    match matrix::invert(&h.h) {
        Some(inv) => landmarks_with_inverse(landmarks, &inv, world_z, depth_scale),
        None => landmarks
            .iter()
            .map(|lm| WorldLandmark {
                position: None,
                visibility: lm.visibility,
            })
            .collect(),
    }
}

fn landmarks_with_inverse(
    landmarks: &[PoseLandmark],
    inv: &Mat3,
    world_z: f64,
    depth_scale: f64,
) -> Vec<WorldLandmark> {
    landmarks
        .iter()
        .map(|lm| WorldLandmark {
            position: apply_matrix(inv, lm.position())
                .map(|g| WorldPoint::new(g.x, g.y, world_z + lm.z * depth_scale)),
            visibility: lm.visibility,
        })
        .collect()
}

/// Stateful transformer for one calibration session.
#[derive(Clone, Debug, Default)]
pub struct CoordinateTransformer {
    homography: Option<Homography>,
    camera: Option<CameraPositionConfig>,
    options: TransformOptions,
    depth_scale: Option<f64>,
    cache: InverseCache,
}

impl CoordinateTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Override the landmark depth scale.
    pub fn with_depth_scale(mut self, depth_scale: f64) -> Self {
        self.depth_scale = Some(depth_scale);
        self
    }

    /// Install a new homography and camera prior.
    ///
    /// The inverse cache is always invalidated. An invalid homography leaves
    /// the transformer without an active calibration and returns `false`.
    pub fn set_homography(
        &mut self,
        homography: Homography,
        camera: Option<CameraPositionConfig>,
    ) -> bool {
        self.cache.invalidate();
        if !is_valid_homography(&homography) {
            log::warn!("rejecting invalid homography {:?}", homography.to_flat());
            self.homography = None;
            self.camera = None;
            return false;
        }
        self.homography = Some(homography);
        self.camera = camera;
        true
    }

    /// Drop the active calibration.
    pub fn clear(&mut self) {
        self.cache.invalidate();
        self.homography = None;
        self.camera = None;
    }

    pub fn homography(&self) -> Option<&Homography> {
        self.homography.as_ref()
    }

    pub fn camera(&self) -> Option<&CameraPositionConfig> {
        self.camera.as_ref()
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn inverse(&mut self) -> Option<Mat3> {
        let h = self.homography?;
        let modifier = self.camera.map_or(0, |c| c.fingerprint());
        self.cache.get_or_invert(&h.h, modifier)
    }

    pub fn image_to_world(&mut self, point: ImagePoint, z: Option<f64>) -> Option<WorldPoint> {
        let inv = self.inverse()?;
        image_to_world_with_inverse(point, &inv, z, self.camera.as_ref(), &self.options)
    }

    pub fn world_to_image(&self, point: &WorldPoint) -> Option<ImagePoint> {
        world_to_image(point, self.homography.as_ref()?)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, points), fields(n = points.len()))
    )]
    pub fn batch_image_to_world(&mut self, points: &[ImagePoint], z: f64) -> Vec<Option<WorldPoint>> {
        match self.inverse() {
            Some(inv) => batch_with_inverse(points, &inv, z),
            None => vec![None; points.len()],
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, landmarks), fields(n = landmarks.len()))
    )]
    pub fn transform_pose_landmarks(
        &mut self,
        landmarks: &[PoseLandmark],
        world_z: f64,
    ) -> Vec<WorldLandmark> {
        let scale = self.depth_scale.unwrap_or(DEFAULT_DEPTH_SCALE);
        match self.inverse() {
            Some(inv) => landmarks_with_inverse(landmarks, &inv, world_z, scale),
            None => landmarks
                .iter()
                .map(|lm| WorldLandmark {
                    position: None,
                    visibility: lm.visibility,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use court_calib_core::CameraEdge;

    fn perspective() -> Homography {
        Homography::from_array([
            [95.0, 0.0, 960.0], //
            [0.0, -30.0, 520.0],
            [0.0, 0.055, 1.0],
        ])
    }

    #[test]
    fn round_trip_law_holds() {
        let h = perspective();
        for p in [
            ImagePoint::new(960.0, 540.0),
            ImagePoint::new(100.0, 900.0),
            ImagePoint::new(1800.0, 300.0),
        ] {
            let w = image_to_world(p, &h, None, None).expect("finite");
            assert_eq!(w.z, 0.0);
            let back = world_to_image(&w, &h).expect("finite");
            assert!((back - p).norm() <= 1e-6 * p.coords.norm(), "{back:?} vs {p:?}");
        }
    }

    #[test]
    fn explicit_height_is_reported() {
        let h = perspective();
        let w = image_to_world(ImagePoint::new(960.0, 540.0), &h, Some(1.2), None).expect("finite");
        assert_eq!(w.z, 1.2);
    }

    #[test]
    fn default_options_match_empty_config() {
        let parsed: TransformOptions = serde_json::from_str("{}").expect("parse");
        assert_eq!(parsed, TransformOptions::default());
        assert!(!parsed.parallax_correction);
    }

    #[test]
    fn camera_prior_only_sets_height_by_default() {
        let h = perspective();
        let cam = CameraPositionConfig::new(CameraEdge::Bottom, 4.0, 5.0);
        let p = ImagePoint::new(1100.0, 500.0);
        let ground = image_to_world(p, &h, None, None).expect("ground");
        let lifted = image_to_world(p, &h, None, Some(&cam)).expect("lifted");

        let expected_z = estimate_height(&cam, &HeightModel::default()).expect("height");
        assert_abs_diff_eq!(lifted.z, expected_z, epsilon = 1e-12);
        assert_eq!(lifted.x, ground.x);
        assert_eq!(lifted.y, ground.y);

        let mut t = CoordinateTransformer::default();
        assert!(t.set_homography(h, Some(cam)));
        let cached = t.image_to_world(p, None).expect("lifted");
        assert_eq!(cached, lifted);
    }

    #[test]
    fn parallax_correction_pulls_toward_camera() {
        let h = perspective();
        let cam = CameraPositionConfig::new(CameraEdge::Bottom, 4.0, 5.0);
        let p = ImagePoint::new(1100.0, 500.0);
        let inv = matrix::invert(&h.h).expect("invertible");
        let options = TransformOptions {
            parallax_correction: true,
            ..TransformOptions::default()
        };
        let ground = image_to_world(p, &h, None, None).expect("ground");
        let lifted = image_to_world_with_inverse(p, &inv, None, Some(&cam), &options).expect("lifted");

        // camera sits at y = -10.7, so the lifted point is pulled toward it
        assert!(lifted.z > 0.0);
        assert!(lifted.y < ground.y);
        assert!(lifted.x.abs() < ground.x.abs());
    }

    #[test]
    fn points_at_infinity_are_none() {
        // w = 0.055 * y + 1 -> the image horizon sits where v = -30/0.055
        let h = perspective();
        let inv = matrix::invert(&h.h).expect("invertible");
        let horizon_v = {
            // solve inv row 3 . [u, v, 1] = 0 at u = 960
            let r = inv.row(2);
            -(r[0] * 960.0 + r[2]) / r[1]
        };
        assert!(image_to_world(ImagePoint::new(960.0, horizon_v), &h, None, None).is_none());
    }

    #[test]
    fn singular_homography_yields_none_everywhere() {
        let h = Homography::from_array([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]);
        assert!(!is_valid_homography(&h));
        assert!(image_to_world(ImagePoint::new(1.0, 1.0), &h, None, None).is_none());
        let batch = batch_image_to_world(&[ImagePoint::new(1.0, 1.0); 3], &h, 0.0);
        assert!(batch.iter().all(Option::is_none));
    }

    #[test]
    fn validity_checks() {
        assert!(is_valid_homography(&perspective()));

        let mut zero_corner = perspective();
        zero_corner.h[(2, 2)] = 1e-12;
        assert!(!is_valid_homography(&zero_corner));

        let mut nan = perspective();
        nan.h[(0, 1)] = f64::NAN;
        assert!(!is_valid_homography(&nan));

        let mut inf = perspective();
        inf.h[(1, 1)] = f64::INFINITY;
        assert!(!is_valid_homography(&inf));
    }

    #[test]
    fn batch_matches_single_point_calls() {
        let h = perspective();
        let pts = [
            ImagePoint::new(300.0, 700.0),
            ImagePoint::new(960.0, 400.0),
            ImagePoint::new(1500.0, 650.0),
        ];
        let batch = batch_image_to_world(&pts, &h, 0.3);
        for (p, b) in pts.iter().zip(&batch) {
            let single = image_to_world(*p, &h, Some(0.3), None).expect("finite");
            let b = b.expect("finite");
            assert_abs_diff_eq!(b.x, single.x, epsilon = 1e-12);
            assert_abs_diff_eq!(b.y, single.y, epsilon = 1e-12);
            assert_eq!(b.z, 0.3);
        }
    }

    #[test]
    fn landmarks_keep_visibility_and_depth() {
        let h = perspective();
        let lms = [
            PoseLandmark::new(960.0, 520.0, 0.4, 0.9),
            PoseLandmark::new(1000.0, 600.0, -0.2, 0.1),
        ];
        let out = transform_pose_landmarks(&lms, &h, 1.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].visibility, 0.9);
        assert_eq!(out[1].visibility, 0.1);
        let p0 = out[0].position.expect("finite");
        assert_abs_diff_eq!(p0.z, 1.0 + 0.4 * DEFAULT_DEPTH_SCALE, epsilon = 1e-12);
        // (960, 520) is the image of the net center
        assert_abs_diff_eq!(p0.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p0.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn transformer_caches_until_homography_changes() {
        let mut t = CoordinateTransformer::default();
        assert!(t.image_to_world(ImagePoint::new(1.0, 1.0), None).is_none());

        assert!(t.set_homography(perspective(), None));
        let a = t.image_to_world(ImagePoint::new(960.0, 520.0), None).expect("finite");
        let _ = t.image_to_world(ImagePoint::new(100.0, 700.0), None);
        assert_eq!(t.cache_stats(), CacheStats { hits: 1, misses: 1 });
        assert_abs_diff_eq!(a.x, 0.0, epsilon = 1e-9);

        // a different calibration must not see the old inverse
        let shifted = Homography::from_array([[95.0, 0.0, 860.0], [0.0, -30.0, 520.0], [0.0, 0.055, 1.0]]);
        assert!(t.set_homography(shifted, None));
        assert_eq!(t.cache_stats(), CacheStats::default());
        let b = t.image_to_world(ImagePoint::new(960.0, 520.0), None).expect("finite");
        assert!(b.x > 0.5);
    }

    #[test]
    fn invalid_homography_clears_the_session() {
        let mut t = CoordinateTransformer::default();
        assert!(t.set_homography(perspective(), None));
        let bad = Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        assert!(!t.set_homography(bad, None));
        assert!(t.homography().is_none());
        assert!(t
            .batch_image_to_world(&[ImagePoint::new(1.0, 2.0)], 0.0)
            .iter()
            .all(Option::is_none));
    }
}
