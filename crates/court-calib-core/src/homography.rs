use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::matrix::{self, Mat3, SINGULAR_EPS};

/// Planar projective transform, `p_img ~ H * p_world`.
///
/// Serializes as nested rows; deserializes from either nested rows or a
/// flat row-major array of nine numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "HomographyRepr", into = "HomographyRepr")]
pub struct Homography {
    pub h: Mat3,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum HomographyRepr {
    Rows([[f64; 3]; 3]),
    Flat([f64; 9]),
}

impl From<HomographyRepr> for Homography {
    fn from(repr: HomographyRepr) -> Self {
        match repr {
            HomographyRepr::Rows(rows) => Self::from_array(rows),
            HomographyRepr::Flat(flat) => Self::from_flat(flat),
        }
    }
}

impl From<Homography> for HomographyRepr {
    fn from(h: Homography) -> Self {
        HomographyRepr::Rows(h.to_array())
    }
}

impl Homography {
    pub fn new(h: Mat3) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(matrix::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(matrix::from_rows(rows))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        matrix::to_rows(&self.h)
    }

    pub fn from_flat(flat: [f64; 9]) -> Self {
        Self::new(matrix::from_flat(flat))
    }

    pub fn to_flat(&self) -> [f64; 9] {
        matrix::to_flat(&self.h)
    }

    pub fn determinant(&self) -> f64 {
        matrix::determinant(&self.h)
    }

    /// Apply the transform with a guarded homogeneous divide.
    ///
    /// Returns `None` when the point maps to the line at infinity.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        apply_matrix(&self.h, p)
    }

    pub fn inverse(&self) -> Option<Self> {
        matrix::invert(&self.h).map(Self::new)
    }

    /// Scale so that `H[2][2] == 1`. `None` if that entry is degenerate.
    pub fn normalized(&self) -> Option<Self> {
        let s = self.h[(2, 2)];
        if !s.is_finite() || s.abs() < SINGULAR_EPS {
            return None;
        }
        Some(Self::new(self.h / s))
    }
}

/// `m * [x, y, 1]`, divided by the homogeneous component.
#[inline]
pub fn apply_matrix(m: &Mat3, p: Point2<f64>) -> Option<Point2<f64>> {
    let v = matrix::multiply_vector(m, &Vector3::new(p.x, p.y, 1.0));
    let w = v[2];
    if !w.is_finite() || w.abs() < SINGULAR_EPS {
        return None;
    }
    let out = Point2::new(v[0] / w, v[1] / w);
    (out.x.is_finite() && out.y.is_finite()).then_some(out)
}
