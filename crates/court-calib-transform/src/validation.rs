//! Numerical quality checks for a calibration.
//!
//! Three independent checks (round-trip accuracy, boundary sanity and scale
//! consistency) are combined into a weighted score. None of them panic or
//! error on degenerate input; a broken homography scores zero and explains
//! why in the result details.

use court_calib_core::{apply_matrix, matrix, FrameSize, Homography, ImagePoint, Mat3, WorldPoint};
use court_calib_homography::{CourtDimensions, CourtModel};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::transformer::is_valid_homography;

/// Outcome of a single check.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ValidationResult {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            confidence: 0.0,
            details: Vec::new(),
        }
    }
}

/// Combined report of the three checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystemValidation {
    pub round_trip: ValidationResult,
    pub boundary: ValidationResult,
    pub scale_consistency: ValidationResult,
    pub overall_score: f64,
    /// All three checks passed.
    pub is_valid: bool,
    #[serde(default)]
    pub details: Vec<String>,
    /// Score threshold the report was produced with.
    pub min_overall_score: f64,
}

impl CoordinateSystemValidation {
    /// The caller should ask the user to redraw the court lines.
    pub fn needs_recalibration(&self) -> bool {
        !self.is_valid || self.overall_score < self.min_overall_score
    }
}

/// Thresholds and weights of the checks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Average round-trip error allowed, pixels. The maximum may be twice this.
    pub round_trip_tolerance_px: f64,
    /// Points farther than this multiple of the court half extents are out.
    pub boundary_factor: f64,
    pub max_out_of_bounds_ratio: f64,
    /// Half-width of the horizontal probe used to measure meters per pixel.
    pub scale_probe_px: f64,
    pub max_scale_deviation: f64,
    pub max_avg_scale_deviation: f64,
    pub round_trip_weight: f64,
    pub boundary_weight: f64,
    pub scale_weight: f64,
    pub min_overall_score: f64,
    pub court: CourtDimensions,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            round_trip_tolerance_px: 2.0,
            boundary_factor: 2.0,
            max_out_of_bounds_ratio: 0.1,
            scale_probe_px: 50.0,
            max_scale_deviation: 0.2,
            max_avg_scale_deviation: 0.1,
            round_trip_weight: 0.4,
            boundary_weight: 0.3,
            scale_weight: 0.3,
            min_overall_score: 0.7,
            court: CourtDimensions::default(),
        }
    }
}

/// Deterministic probe points for `frame`: a 5×5 grid spanning 10–90 % of
/// each axis, the exact center, and the four corners inset by 5 %.
pub fn generate_test_points(frame: FrameSize) -> Vec<ImagePoint> {
    let w = frame.width as f64;
    let h = frame.height as f64;
    let mut out = Vec::with_capacity(30);
    for j in 0..5 {
        for i in 0..5 {
            let fx = 0.1 + 0.2 * i as f64;
            let fy = 0.1 + 0.2 * j as f64;
            out.push(ImagePoint::new(fx * w, fy * h));
        }
    }
    out.push(ImagePoint::new(0.5 * w, 0.5 * h));
    for (fx, fy) in [(0.05, 0.05), (0.95, 0.05), (0.05, 0.95), (0.95, 0.95)] {
        out.push(ImagePoint::new(fx * w, fy * h));
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct CalibrationValidator {
    config: ValidatorConfig,
}

impl CalibrationValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run all checks. `test_points` defaults to [`generate_test_points`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, h, test_points), fields(frame = ?frame))
    )]
    pub fn validate(
        &self,
        h: &Homography,
        frame: FrameSize,
        test_points: Option<&[ImagePoint]>,
    ) -> CoordinateSystemValidation {
        let cfg = &self.config;
        let generated;
        let points = match test_points {
            Some(p) => p,
            None => {
                generated = generate_test_points(frame);
                &generated
            }
        };

        let (round_trip, boundary, scale_consistency) = match checked_inverse(h) {
            Ok(inv) => (
                self.round_trip_with(h, &inv, points),
                self.boundaries_with(&inv, points),
                self.scale_with(&inv, frame),
            ),
            Err(reason) => (
                ValidationResult::failed(reason),
                ValidationResult::failed(reason),
                ValidationResult::failed(reason),
            ),
        };

        let weight_sum = cfg.round_trip_weight + cfg.boundary_weight + cfg.scale_weight;
        let overall_score = if weight_sum > 0.0 {
            (cfg.round_trip_weight * round_trip.confidence
                + cfg.boundary_weight * boundary.confidence
                + cfg.scale_weight * scale_consistency.confidence)
                / weight_sum
        } else {
            0.0
        };
        let is_valid = round_trip.is_valid && boundary.is_valid && scale_consistency.is_valid;

        let mut details = Vec::new();
        for (name, r) in [
            ("round-trip", &round_trip),
            ("boundary", &boundary),
            ("scale", &scale_consistency),
        ] {
            let status = if r.is_valid { "ok" } else { "failed" };
            details.push(format!("{name}: {status} (confidence {:.2})", r.confidence));
        }
        details.push(format!("overall score {overall_score:.3}"));

        if is_valid {
            log::debug!("calibration validated, score {overall_score:.3}");
        } else {
            log::warn!("calibration failed validation, score {overall_score:.3}");
        }

        CoordinateSystemValidation {
            round_trip,
            boundary,
            scale_consistency,
            overall_score,
            is_valid,
            details,
            min_overall_score: cfg.min_overall_score,
        }
    }

    /// Map each point to the court plane and back; measures pixel drift.
    pub fn validate_round_trip(&self, h: &Homography, points: &[ImagePoint]) -> ValidationResult {
        match checked_inverse(h) {
            Ok(inv) => self.round_trip_with(h, &inv, points),
            Err(reason) => ValidationResult::failed(reason),
        }
    }

    /// Fraction of points whose court position is implausibly far away.
    pub fn validate_boundaries(&self, h: &Homography, points: &[ImagePoint]) -> ValidationResult {
        match checked_inverse(h) {
            Ok(inv) => self.boundaries_with(&inv, points),
            Err(reason) => ValidationResult::failed(reason),
        }
    }

    /// Compare meters-per-pixel at the center and the four quadrant centers.
    pub fn validate_scale_consistency(&self, h: &Homography, frame: FrameSize) -> ValidationResult {
        match checked_inverse(h) {
            Ok(inv) => self.scale_with(&inv, frame),
            Err(reason) => ValidationResult::failed(reason),
        }
    }

    fn round_trip_with(&self, h: &Homography, inv: &Mat3, points: &[ImagePoint]) -> ValidationResult {
        if points.is_empty() {
            return ValidationResult::failed("no test points");
        }
        let tol = self.config.round_trip_tolerance_px;

        let mut errors = Vec::with_capacity(points.len());
        let mut failed = 0usize;
        for p in points {
            let back = apply_matrix(inv, *p).and_then(|w| h.apply(w));
            match back {
                Some(b) => errors.push((b - *p).norm()),
                None => failed += 1,
            }
        }
        if errors.is_empty() {
            return ValidationResult::failed("no test point survived the round trip");
        }

        let avg = errors.iter().sum::<f64>() / errors.len() as f64;
        let max = errors.iter().copied().fold(0.0, f64::max);
        let mut details = vec![
            format!("average round-trip error {avg:.4} px"),
            format!("maximum round-trip error {max:.4} px"),
        ];
        if failed > 0 {
            details.push(format!("{failed} of {} points mapped to infinity", points.len()));
        }

        // a point that cannot be projected fails the check even if the rest are exact
        let accurate = avg <= tol && max <= 2.0 * tol;
        let is_valid = failed == 0 && accurate;
        let error = if !accurate {
            Some(format!("round-trip error too large ({avg:.3} px avg)"))
        } else if failed > 0 {
            Some(format!("{failed} test points could not be projected"))
        } else {
            None
        };
        let confidence = if tol > 0.0 { (1.0 - avg / tol).clamp(0.0, 1.0) } else { 0.0 };
        ValidationResult {
            is_valid,
            error,
            confidence,
            details,
        }
    }

    fn boundaries_with(&self, inv: &Mat3, points: &[ImagePoint]) -> ValidationResult {
        if points.is_empty() {
            return ValidationResult::failed("no test points");
        }
        let cfg = &self.config;
        let court = CourtModel::new(cfg.court);

        let outside = points
            .iter()
            .filter(|p| match apply_matrix(inv, **p) {
                Some(w) => !court.contains(&WorldPoint::new(w.x, w.y, 0.0), cfg.boundary_factor),
                None => true,
            })
            .count();
        let ratio = outside as f64 / points.len() as f64;

        let is_valid = ratio < cfg.max_out_of_bounds_ratio;
        ValidationResult {
            is_valid,
            error: (!is_valid)
                .then(|| format!("{:.0}% of points fall far outside the court", ratio * 100.0)),
            confidence: (1.0 - ratio).clamp(0.0, 1.0),
            details: vec![format!("{outside} of {} points out of bounds", points.len())],
        }
    }

    fn scale_with(&self, inv: &Mat3, frame: FrameSize) -> ValidationResult {
        let cfg = &self.config;
        if frame.is_empty() {
            return ValidationResult::failed("empty frame");
        }
        let w = frame.width as f64;
        let h = frame.height as f64;
        let probe = cfg.scale_probe_px;

        let regions = [(0.5, 0.5), (0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
        let scales: Vec<f64> = regions
            .iter()
            .filter_map(|&(fx, fy)| {
                let (cx, cy) = (fx * w, fy * h);
                let a = apply_matrix(inv, ImagePoint::new(cx - probe, cy))?;
                let b = apply_matrix(inv, ImagePoint::new(cx + probe, cy))?;
                let mpp = (b - a).norm() / (2.0 * probe);
                (mpp.is_finite() && mpp > 0.0).then_some(mpp)
            })
            .collect();

        if scales.len() < 2 {
            return ValidationResult::failed(format!(
                "only {} regions produced a usable scale",
                scales.len()
            ));
        }

        let mean = scales.iter().sum::<f64>() / scales.len() as f64;
        let deviations: Vec<f64> = scales.iter().map(|s| (s - mean).abs() / mean).collect();
        let max_dev = deviations.iter().copied().fold(0.0, f64::max);
        let avg_dev = deviations.iter().sum::<f64>() / deviations.len() as f64;

        let is_valid = max_dev < cfg.max_scale_deviation && avg_dev < cfg.max_avg_scale_deviation;
        let confidence = if cfg.max_scale_deviation > 0.0 {
            (1.0 - avg_dev / cfg.max_scale_deviation).clamp(0.0, 1.0)
        } else {
            0.0
        };
        ValidationResult {
            is_valid,
            error: (!is_valid).then(|| {
                format!(
                    "scale varies across the frame ({:.0}% max, {:.0}% avg)",
                    max_dev * 100.0,
                    avg_dev * 100.0
                )
            }),
            confidence,
            details: vec![
                format!("{} regions, mean {mean:.5} m/px", scales.len()),
                format!("max deviation {:.1}%, average {:.1}%", max_dev * 100.0, avg_dev * 100.0),
            ],
        }
    }
}

fn checked_inverse(h: &Homography) -> Result<Mat3, &'static str> {
    if !is_valid_homography(h) {
        return Err("homography is not finite or not invertible");
    }
    matrix::invert(&h.h).ok_or("homography is singular")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame() -> FrameSize {
        FrameSize::new(1920, 1080)
    }

    fn top_down() -> Homography {
        Homography::from_array([
            [150.0, 0.0, 960.0], //
            [0.0, 150.0, 540.0],
            [0.0, 0.0, 1.0],
        ])
    }

    fn strong_perspective() -> Homography {
        Homography::from_array([
            [95.0, 0.0, 960.0], //
            [0.0, -30.0, 520.0],
            [0.0, 0.055, 1.0],
        ])
    }

    #[test]
    fn test_points_are_deterministic() {
        let pts = generate_test_points(frame());
        assert_eq!(pts.len(), 30);
        assert_eq!(pts, generate_test_points(frame()));
        assert_eq!(pts[25], ImagePoint::new(960.0, 540.0));
        assert_abs_diff_eq!(pts[0].x, 192.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pts[29].y, 1026.0, epsilon = 1e-9);
    }

    #[test]
    fn perfect_homography_scores_high() {
        let v = CalibrationValidator::default().validate(&top_down(), frame(), None);
        assert!(v.is_valid, "{:?}", v.details);
        assert!(v.overall_score >= 0.95, "score {}", v.overall_score);
        assert!(!v.needs_recalibration());
        assert_eq!(v.boundary.confidence, 1.0);
    }

    #[test]
    fn degenerate_homography_scores_zero() {
        let singular = Homography::from_array([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]);
        let v = CalibrationValidator::default().validate(&singular, frame(), None);
        assert!(!v.is_valid);
        assert_eq!(v.overall_score, 0.0);
        assert!(v.round_trip.error.is_some());
        assert!(v.needs_recalibration());

        let mut zero_corner = top_down();
        zero_corner.h[(2, 2)] = 0.0;
        let v = CalibrationValidator::default().validate(&zero_corner, frame(), None);
        assert_eq!(v.overall_score, 0.0);
    }

    #[test]
    fn strong_perspective_fails_scale_consistency() {
        let validator = CalibrationValidator::default();
        let scale = validator.validate_scale_consistency(&strong_perspective(), frame());
        assert!(!scale.is_valid);
        assert!(scale.error.is_some());
        assert!(scale.confidence < 1.0);
    }

    #[test]
    fn far_away_points_fail_boundary_check() {
        // 5 px per meter: most of the frame maps far beyond the court
        let tiny = Homography::from_array([[5.0, 0.0, 960.0], [0.0, 5.0, 540.0], [0.0, 0.0, 1.0]]);
        let validator = CalibrationValidator::default();
        let b = validator.validate_boundaries(&tiny, &generate_test_points(frame()));
        assert!(!b.is_valid);
        assert!(b.confidence < 0.5);
    }

    #[test]
    fn round_trip_of_exact_homography_is_tight() {
        let validator = CalibrationValidator::default();
        let pts = generate_test_points(frame());
        let r = validator.validate_round_trip(&strong_perspective(), &pts);
        assert!(r.is_valid, "{:?}", r.details);
        assert!(r.confidence > 0.99);
        let empty = validator.validate_round_trip(&strong_perspective(), &[]);
        assert!(!empty.is_valid);
    }

    #[test]
    fn unprojectable_point_fails_round_trip() {
        // self-inverse; the image row v = 2 maps to infinity
        let h = Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.5, -1.0]]);
        let validator = CalibrationValidator::default();
        let pts = [
            ImagePoint::new(10.0, 0.0),
            ImagePoint::new(3.0, 1.0),
            ImagePoint::new(10.0, 2.0),
        ];
        let r = validator.validate_round_trip(&h, &pts);
        assert!(!r.is_valid);
        assert_eq!(r.confidence, 1.0);
        assert!(r.error.as_deref().is_some_and(|e| e.contains("could not be projected")));
        assert!(r.details.iter().any(|d| d.contains("1 of 3")));
    }

    #[test]
    fn boundary_factor_scales_the_court() {
        let h = Homography::from_array([[150.0, 0.0, 960.0], [0.0, 150.0, 540.0], [0.0, 0.0, 1.0]]);
        // world x = 7.0 m: outside 2x the 3.05 m half width, inside 3x
        let pts = [ImagePoint::new(960.0 + 7.0 * 150.0, 540.0)];
        let strict = CalibrationValidator::default();
        assert!(!strict.validate_boundaries(&h, &pts).is_valid);

        let loose = CalibrationValidator::new(ValidatorConfig {
            boundary_factor: 3.0,
            ..ValidatorConfig::default()
        });
        assert!(loose.validate_boundaries(&h, &pts).is_valid);
    }

    #[test]
    fn stricter_threshold_requests_recalibration() {
        let cfg = ValidatorConfig {
            min_overall_score: 1.01,
            ..ValidatorConfig::default()
        };
        let v = CalibrationValidator::new(cfg).validate(&top_down(), frame(), None);
        assert!(v.is_valid);
        assert!(v.needs_recalibration());
    }

    #[test]
    fn config_json_fills_defaults() {
        let cfg: ValidatorConfig = serde_json::from_str(r#"{ "round_trip_tolerance_px": 1.5 }"#)
            .expect("parse");
        assert_eq!(cfg.round_trip_tolerance_px, 1.5);
        assert_eq!(cfg.min_overall_score, 0.7);
        assert_eq!(cfg.scale_weight, 0.3);
    }
}
