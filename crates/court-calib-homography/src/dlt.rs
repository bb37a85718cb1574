//! Hartley-normalized direct linear transform.

use court_calib_core::{matrix, Homography, Mat3};
use nalgebra::{DMatrix, Point2, Vector3};

use crate::error::CalibrationError;

/// Smallest accepted ratio between the second-smallest and the largest
/// singular value of the normalized DLT system.
pub const MIN_CONDITIONING: f64 = 1e-8;

/// Result of one DLT solve.
#[derive(Clone, Copy, Debug)]
pub struct DltSolution {
    /// `p_img ~ H * p_world`, scaled so `H[2][2] == 1`.
    pub homography: Homography,
    /// `sigma_8 / sigma_1` of the normalized system; close to zero means the
    /// correspondences do not pin down a unique homography.
    pub conditioning: f64,
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Mat3 {
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Translate to the centroid and scale so the mean distance is `sqrt(2)`.
fn normalize_points(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Mat3)> {
    let n = pts.len() as f64;
    let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    Some((out, t))
}

/// Estimate `H` with `image ~ H * world` from at least four point pairs.
///
/// The system is padded to at least nine rows so the null vector is part of
/// the SVD even in the minimal four-point case.
pub fn solve_dlt(
    world: &[Point2<f64>],
    image: &[Point2<f64>],
) -> Result<DltSolution, CalibrationError> {
    if world.len() != image.len() {
        return Err(CalibrationError::SolveFailed(
            "world and image point counts differ",
        ));
    }
    if world.len() < 4 {
        return Err(CalibrationError::DegenerateGeometry(format!(
            "{} distinct anchor points, need at least 4",
            world.len()
        )));
    }

    let (w, tw) = normalize_points(world).ok_or_else(|| {
        CalibrationError::DegenerateGeometry("court anchors coincide".to_string())
    })?;
    let (i, ti) = normalize_points(image).ok_or_else(|| {
        CalibrationError::DegenerateGeometry("drawn anchors coincide".to_string())
    })?;

    let n = world.len();
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);

    for k in 0..n {
        let x = w[k].x;
        let y = w[k].y;
        let u = i[k].x;
        let v = i[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let vt = svd
        .v_t
        .ok_or(CalibrationError::SolveFailed("SVD did not converge"))?;

    let mut sigma: Vec<(usize, f64)> = svd.singular_values.iter().copied().enumerate().collect();
    if sigma.len() < 9 {
        return Err(CalibrationError::SolveFailed("DLT system is too small"));
    }
    sigma.sort_by(|l, r| r.1.total_cmp(&l.1));
    let largest = sigma[0].1;
    let (null_idx, _) = sigma[8];
    let conditioning = if largest > 0.0 { sigma[7].1 / largest } else { 0.0 };

    if !conditioning.is_finite() || conditioning < MIN_CONDITIONING {
        log::debug!("DLT rank deficient (conditioning {:.3e})", conditioning);
        return Err(CalibrationError::DegenerateGeometry(
            "correspondences are rank deficient".to_string(),
        ));
    }

    let h = vt.row(null_idx);
    let hn = Mat3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    // Denormalize: H = Ti^{-1} * Hn * Tw
    let ti_inv = matrix::invert(&ti).ok_or(CalibrationError::SolveFailed(
        "image normalization is singular",
    ))?;
    let homography = Homography::new(ti_inv * hn * tw)
        .normalized()
        .ok_or(CalibrationError::InsufficientGeometricDiversity)?;

    Ok(DltSolution {
        homography,
        conditioning,
    })
}
