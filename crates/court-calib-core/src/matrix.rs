//! Closed-form 3×3 linear algebra.
//!
//! Every projective transform in the workspace goes through these helpers.
//! Inversion uses the adjugate (cofactor) form instead of a general
//! elimination so the result is deterministic and branch-free apart from the
//! singularity check.

use nalgebra::{Matrix3, Vector3};

/// Absolute determinant threshold below which a matrix has no usable inverse.
pub const SINGULAR_EPS: f64 = 1e-10;

/// Row-major 3×3 matrix of `f64`.
pub type Mat3 = Matrix3<f64>;

#[inline]
pub fn identity() -> Mat3 {
    Mat3::identity()
}

/// Build a matrix from nested rows.
pub fn from_rows(rows: [[f64; 3]; 3]) -> Mat3 {
    Mat3::new(
        rows[0][0], rows[0][1], rows[0][2], //
        rows[1][0], rows[1][1], rows[1][2], //
        rows[2][0], rows[2][1], rows[2][2],
    )
}

pub fn to_rows(m: &Mat3) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

/// Build a matrix from a flat row-major array.
pub fn from_flat(flat: [f64; 9]) -> Mat3 {
    Mat3::from_row_slice(&flat)
}

pub fn to_flat(m: &Mat3) -> [f64; 9] {
    let r = to_rows(m);
    [
        r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
    ]
}

#[inline]
pub fn multiply(a: &Mat3, b: &Mat3) -> Mat3 {
    a * b
}

#[inline]
pub fn multiply_vector(a: &Mat3, v: &Vector3<f64>) -> Vector3<f64> {
    a * v
}

/// True when every cell is a finite number.
pub fn is_finite(m: &Mat3) -> bool {
    m.iter().all(|v| v.is_finite())
}

/// Cofactor matrix `C` with `C[(i, j)] = (-1)^(i+j) * minor(i, j)`.
fn cofactors(m: &Mat3) -> Mat3 {
    let a = to_rows(m);
    Mat3::new(
        a[1][1] * a[2][2] - a[1][2] * a[2][1],
        -(a[1][0] * a[2][2] - a[1][2] * a[2][0]),
        a[1][0] * a[2][1] - a[1][1] * a[2][0],
        //
        -(a[0][1] * a[2][2] - a[0][2] * a[2][1]),
        a[0][0] * a[2][2] - a[0][2] * a[2][0],
        -(a[0][0] * a[2][1] - a[0][1] * a[2][0]),
        //
        a[0][1] * a[1][2] - a[0][2] * a[1][1],
        -(a[0][0] * a[1][2] - a[0][2] * a[1][0]),
        a[0][0] * a[1][1] - a[0][1] * a[1][0],
    )
}

/// Determinant by cofactor expansion along the first row.
pub fn determinant(m: &Mat3) -> f64 {
    let c = cofactors(m);
    m[(0, 0)] * c[(0, 0)] + m[(0, 1)] * c[(0, 1)] + m[(0, 2)] * c[(0, 2)]
}

/// Inverse via `adj(m) / det(m)`.
///
/// Returns `None` when `|det| < SINGULAR_EPS` or any cell is not finite.
/// Callers must treat `None` as a hard failure.
pub fn invert(m: &Mat3) -> Option<Mat3> {
    if !is_finite(m) {
        return None;
    }
    let c = cofactors(m);
    let det = m[(0, 0)] * c[(0, 0)] + m[(0, 1)] * c[(0, 1)] + m[(0, 2)] * c[(0, 2)];
    if !det.is_finite() || det.abs() < SINGULAR_EPS {
        return None;
    }
    let inv = c.transpose() / det;
    is_finite(&inv).then_some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn perspective() -> Mat3 {
        from_rows([
            [52.0, -3.5, 960.0],
            [1.2, -18.0, 610.0],
            [0.002, -0.031, 1.0],
        ])
    }

    #[test]
    fn determinant_matches_nalgebra() {
        let m = perspective();
        assert_abs_diff_eq!(determinant(&m), m.determinant(), epsilon = 1e-9);
        assert_abs_diff_eq!(determinant(&identity()), 1.0);
    }

    #[test]
    fn inverse_is_consistent() {
        for m in [
            perspective(),
            from_rows([[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]),
            from_rows([[1.2, 0.1, 5.0], [-0.05, 0.9, 3.0], [0.001, 0.0005, 1.0]]),
        ] {
            let inv = invert(&m).expect("invertible");
            assert_abs_diff_eq!(multiply(&m, &inv), identity(), epsilon = 1e-9);
            assert_abs_diff_eq!(multiply(&inv, &m), identity(), epsilon = 1e-9);
        }
    }

    #[test]
    fn singular_matrices_have_no_inverse() {
        let repeated_rows = from_rows([[1.0, 2.0, 3.0], [1.0, 2.0, 3.0], [0.0, 1.0, 1.0]]);
        assert_eq!(determinant(&repeated_rows), 0.0);
        assert!(invert(&repeated_rows).is_none());

        // det = 1e-12, below the threshold
        let tiny = from_rows([[1e-4, 0.0, 0.0], [0.0, 1e-4, 0.0], [0.0, 0.0, 1e-4]]);
        assert!(invert(&tiny).is_none());
    }

    #[test]
    fn non_finite_cells_are_rejected() {
        let mut m = identity();
        m[(1, 2)] = f64::NAN;
        assert!(invert(&m).is_none());
        m[(1, 2)] = f64::INFINITY;
        assert!(!is_finite(&m));
        assert!(invert(&m).is_none());
    }

    #[test]
    fn flat_and_rows_agree() {
        let m = perspective();
        assert_eq!(from_flat(to_flat(&m)), m);
        assert_eq!(to_flat(&m)[2], 960.0);
        assert_eq!(to_rows(&m)[2][1], -0.031);
    }

    #[test]
    fn multiply_vector_applies_rows() {
        let m = from_rows([[1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]]);
        let v = multiply_vector(&m, &Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(v, Vector3::new(6.0, 1.0, 2.0));
    }
}
