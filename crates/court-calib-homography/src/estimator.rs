//! Homography estimation from court-line correspondences.
//!
//! Every correspondence contributes its two endpoints as point constraints.
//! Endpoints that share a court anchor (for example where the center line
//! meets the short service line) are merged and their drawn positions
//! averaged, so three well-chosen lines are enough for a full solve.

use court_calib_core::{
    matrix, CameraEdge, CameraPositionConfig, FrameSize, Homography, ImagePoint, WorldPoint,
};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::correspondence::LineCorrespondence;
use crate::court::CourtDimensions;
use crate::dlt::solve_dlt;
use crate::error::CalibrationError;

/// Minimum number of usable line correspondences.
pub const MIN_CORRESPONDENCES: usize = 3;

fn default_tolerance_px() -> f64 {
    2.0
}

fn default_merge_tolerance_m() -> f64 {
    1e-3
}

fn default_parallel_tolerance_deg() -> f64 {
    1.0
}

/// Configuration for [`HomographyEstimator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorParams {
    /// Frame the normalized drawn lines are resolved against. When unset,
    /// all drawn lines must share the same draw-time frame.
    #[serde(default)]
    pub frame: Option<FrameSize>,
    #[serde(default)]
    pub court: CourtDimensions,
    /// Reprojection error (pixels) considered accurate.
    #[serde(default = "default_tolerance_px")]
    pub reprojection_tolerance_px: f64,
    /// Court endpoints closer than this are the same anchor.
    #[serde(default = "default_merge_tolerance_m")]
    pub anchor_merge_tolerance_m: f64,
    /// Lines within this angle of each other count as parallel.
    #[serde(default = "default_parallel_tolerance_deg")]
    pub parallel_tolerance_deg: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            frame: None,
            court: CourtDimensions::default(),
            reprojection_tolerance_px: default_tolerance_px(),
            anchor_merge_tolerance_m: default_merge_tolerance_m(),
            parallel_tolerance_deg: default_parallel_tolerance_deg(),
        }
    }
}

/// One merged anchor and how well the solved homography reproduces it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorResidual {
    pub world: WorldPoint,
    /// Mean drawn position in pixels.
    pub image: ImagePoint,
    pub error_px: f64,
}

/// Output of a successful calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    /// Court plane (meters) to image pixels of `frame`.
    pub homography: Homography,
    pub frame: FrameSize,
    /// Root-mean-square reprojection error over all anchors.
    pub reprojection_error_px: f64,
    pub max_reprojection_error_px: f64,
    /// `[0, 1]`, derived from the reprojection error and the camera prior.
    pub confidence: f64,
    pub conditioning: f64,
    pub anchors: Vec<AnchorResidual>,
    #[serde(default)]
    pub camera: Option<CameraPositionConfig>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl CameraParameters {
    /// Number of distinct court anchors the solve used.
    pub fn point_count(&self) -> usize {
        self.anchors.len()
    }
}

#[derive(Clone, Copy, Debug)]
struct Anchor {
    world: Point2<f64>,
    image_sum: Vector2<f64>,
    count: usize,
}

impl Anchor {
    fn image(&self) -> Point2<f64> {
        Point2::from(self.image_sum / self.count as f64)
    }
}

/// Line-based homography estimator.
#[derive(Clone, Debug, Default)]
pub struct HomographyEstimator {
    params: EstimatorParams,
}

impl HomographyEstimator {
    pub fn new(params: EstimatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Solve for the court-to-image homography.
    ///
    /// Unusable correspondences (zero-length or non-finite drawn lines) are
    /// dropped before counting; fewer than [`MIN_CORRESPONDENCES`] remaining is
    /// an error, as is any configuration whose geometry cannot constrain a
    /// unique, invertible homography.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, correspondences, camera), fields(lines = correspondences.len()))
    )]
    pub fn estimate(
        &self,
        correspondences: &[LineCorrespondence],
        camera: Option<&CameraPositionConfig>,
    ) -> Result<CameraParameters, CalibrationError> {
        let p = &self.params;
        if !p.court.is_valid() {
            return Err(CalibrationError::InvalidCourt);
        }

        let usable: Vec<&LineCorrespondence> = correspondences
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let court_ok = [c.court.start, c.court.end]
                    .iter()
                    .all(|q| q.coords.iter().all(|v| v.is_finite()))
                    && c.court.length() > 1e-9;
                if court_ok && c.drawn.is_usable() {
                    Some(c)
                } else {
                    log::warn!(
                        "dropping correspondence #{idx} ({:?} {:?}): unusable geometry",
                        c.court.kind,
                        c.court.side
                    );
                    None
                }
            })
            .collect();

        if usable.len() < MIN_CORRESPONDENCES {
            return Err(CalibrationError::NotEnoughCorrespondences {
                got: usable.len(),
                needed: MIN_CORRESPONDENCES,
            });
        }

        let frame = self.resolve_frame(&usable)?;
        let segments: Vec<([Point2<f64>; 2], [Point2<f64>; 2])> = usable
            .iter()
            .map(|c| {
                let world = [c.court.start.xy(), c.court.end.xy()];
                (world, c.drawn.pixel_endpoints_in(frame))
            })
            .collect();

        let max_sin = p.parallel_tolerance_deg.to_radians().sin();
        let world_dirs: Vec<Vector2<f64>> = segments.iter().map(|(w, _)| w[1] - w[0]).collect();
        let image_dirs: Vec<Vector2<f64>> = segments.iter().map(|(_, i)| i[1] - i[0]).collect();
        if all_parallel(&world_dirs, max_sin) && all_parallel(&image_dirs, max_sin) {
            return Err(CalibrationError::DegenerateGeometry(
                "all lines are mutually parallel".to_string(),
            ));
        }

        let anchors = merge_anchors(&segments, p.anchor_merge_tolerance_m);
        log::debug!(
            "{} correspondences -> {} distinct anchors",
            usable.len(),
            anchors.len()
        );
        let world: Vec<Point2<f64>> = anchors.iter().map(|a| a.world).collect();
        let image: Vec<Point2<f64>> = anchors.iter().map(Anchor::image).collect();

        if world.len() >= 3 && all_collinear(&world) {
            return Err(CalibrationError::DegenerateGeometry(
                "court anchors are collinear".to_string(),
            ));
        }

        let solution = solve_dlt(&world, &image)?;
        let homography = solution.homography;
        if matrix::invert(&homography.h).is_none() {
            return Err(CalibrationError::InsufficientGeometricDiversity);
        }

        let mut residuals = Vec::with_capacity(anchors.len());
        for (w, i) in world.iter().zip(&image) {
            let projected = homography
                .apply(*w)
                .ok_or(CalibrationError::InsufficientGeometricDiversity)?;
            residuals.push(AnchorResidual {
                world: WorldPoint::new(w.x, w.y, 0.0),
                image: *i,
                error_px: (projected - *i).norm(),
            });
        }

        let rms = (residuals.iter().map(|r| r.error_px.powi(2)).sum::<f64>()
            / residuals.len() as f64)
            .sqrt();
        let max = residuals.iter().map(|r| r.error_px).fold(0.0, f64::max);
        let mut confidence = (1.0 - rms / (5.0 * p.reprojection_tolerance_px)).clamp(0.0, 1.0);

        let mut warnings = Vec::new();
        if rms > p.reprojection_tolerance_px {
            warnings.push(format!(
                "reprojection error {rms:.2}px exceeds tolerance {:.2}px",
                p.reprojection_tolerance_px
            ));
        }
        if let Some(cam) = camera {
            if let Some(msg) = check_camera_side(&homography, cam, &p.court) {
                log::warn!("{msg}");
                warnings.push(msg);
                confidence *= 0.5;
            }
        }

        Ok(CameraParameters {
            homography,
            frame,
            reprojection_error_px: rms,
            max_reprojection_error_px: max,
            confidence,
            conditioning: solution.conditioning,
            anchors: residuals,
            camera: camera.copied(),
            warnings,
        })
    }

    fn resolve_frame(&self, usable: &[&LineCorrespondence]) -> Result<FrameSize, CalibrationError> {
        let first = usable[0].drawn.frame;
        match self.params.frame {
            Some(frame) => {
                let target = frame.width as f64 / frame.height.max(1) as f64;
                for c in usable {
                    let f = c.drawn.frame;
                    let aspect = f.width as f64 / f.height as f64;
                    if ((aspect - target) / target).abs() > 0.01 {
                        log::warn!(
                            "line drawn on {}x{} resolved against {}x{} (aspect mismatch)",
                            f.width,
                            f.height,
                            frame.width,
                            frame.height
                        );
                    }
                }
                Ok(frame)
            }
            None if usable.iter().all(|c| c.drawn.frame == first) => Ok(first),
            None => Err(CalibrationError::MixedFrameSizes),
        }
    }
}

/// Convenience wrapper around [`HomographyEstimator::estimate`].
pub fn calculate_camera_parameters(
    correspondences: &[LineCorrespondence],
    camera: Option<&CameraPositionConfig>,
    params: &EstimatorParams,
) -> Result<CameraParameters, CalibrationError> {
    HomographyEstimator::new(params.clone()).estimate(correspondences, camera)
}

fn all_parallel(dirs: &[Vector2<f64>], max_sin: f64) -> bool {
    let Some(first) = dirs.first() else {
        return true;
    };
    dirs.iter().skip(1).all(|d| {
        let denom = first.norm() * d.norm();
        denom <= 0.0 || (first.perp(d) / denom).abs() < max_sin
    })
}

fn all_collinear(pts: &[Point2<f64>]) -> bool {
    let a = pts[0];
    let Some(b) = pts
        .iter()
        .copied()
        .max_by(|p, q| (*p - a).norm().total_cmp(&(*q - a).norm()))
    else {
        return true;
    };
    let dir = b - a;
    let len = dir.norm();
    if len < 1e-12 {
        return true;
    }
    pts.iter()
        .all(|p| (dir.perp(&(*p - a)) / len).abs() < 1e-6 * len.max(1.0))
}

fn merge_anchors(
    segments: &[([Point2<f64>; 2], [Point2<f64>; 2])],
    tolerance: f64,
) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(segments.len() * 2);
    for (world, image) in segments {
        for (w, i) in world.iter().zip(image) {
            match anchors.iter_mut().find(|a| (a.world - *w).norm() <= tolerance) {
                Some(a) => {
                    a.image_sum += i.coords;
                    a.count += 1;
                }
                None => anchors.push(Anchor {
                    world: *w,
                    image_sum: i.coords,
                    count: 1,
                }),
            }
        }
    }
    anchors
}

/// The court side closest to the camera should appear lower in the image.
fn check_camera_side(
    h: &Homography,
    cam: &CameraPositionConfig,
    court: &CourtDimensions,
) -> Option<String> {
    let hw = court.half_width();
    let hl = court.half_length();
    let (near, far) = match cam.edge {
        CameraEdge::Bottom => (Point2::new(0.0, -hl), Point2::new(0.0, hl)),
        CameraEdge::Top => (Point2::new(0.0, hl), Point2::new(0.0, -hl)),
        CameraEdge::Left => (Point2::new(-hw, 0.0), Point2::new(hw, 0.0)),
        CameraEdge::Right => (Point2::new(hw, 0.0), Point2::new(-hw, 0.0)),
        CameraEdge::None => return None,
    };
    match (h.apply(near), h.apply(far)) {
        (Some(n), Some(f)) if n.y > f.y => None,
        (Some(_), Some(_)) => Some(format!(
            "camera prior says {:?} edge, but that side of the court projects above the far side",
            cam.edge
        )),
        _ => Some("court extent projects to infinity; camera prior cannot be checked".to_string()),
    }
}
