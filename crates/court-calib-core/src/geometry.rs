use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Image coordinate, either pixels or normalized `[0, 1]` depending on context.
pub type ImagePoint = Point2<f64>;

/// Court-space coordinate in meters; `z` is height above the court plane.
pub type WorldPoint = Point3<f64>;

/// Pixel dimensions of a video frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(&self) -> ImagePoint {
        Point2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Normalized `[0, 1]` coordinate to pixels.
    #[inline]
    pub fn to_pixels(&self, p: ImagePoint) -> ImagePoint {
        Point2::new(p.x * self.width as f64, p.y * self.height as f64)
    }

    /// Pixel coordinate to normalized. `None` for an empty frame.
    #[inline]
    pub fn to_normalized(&self, p: ImagePoint) -> Option<ImagePoint> {
        if self.is_empty() {
            return None;
        }
        Some(Point2::new(
            p.x / self.width as f64,
            p.y / self.height as f64,
        ))
    }
}

/// Which side of the court the camera looks from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraEdge {
    /// Behind the far baseline (`+y`).
    Top,
    /// Behind the near baseline (`-y`).
    Bottom,
    /// Beyond the `-x` sideline.
    Left,
    /// Beyond the `+x` sideline.
    Right,
    #[default]
    None,
}

impl CameraEdge {
    pub fn is_known(self) -> bool {
        self != CameraEdge::None
    }

    pub fn is_sideline(self) -> bool {
        matches!(self, CameraEdge::Left | CameraEdge::Right)
    }

    pub fn is_baseline(self) -> bool {
        matches!(self, CameraEdge::Top | CameraEdge::Bottom)
    }
}

/// Coarse camera placement prior for one calibration session.
///
/// `distance` is measured in meters from the court edge named by `edge`,
/// `height` is the lens height above the court plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPositionConfig {
    #[serde(default)]
    pub edge: CameraEdge,
    pub distance: f64,
    pub height: f64,
    /// Explicit camera position in court coordinates, overriding the
    /// edge/distance estimate.
    #[serde(default)]
    pub position_3d: Option<WorldPoint>,
}

impl CameraPositionConfig {
    pub fn new(edge: CameraEdge, distance: f64, height: f64) -> Self {
        Self {
            edge,
            distance,
            height,
            position_3d: None,
        }
    }

    /// Camera position in court coordinates.
    ///
    /// Uses `position_3d` when present, otherwise places the camera
    /// `distance` meters beyond the edge of a court with the given half
    /// extents, centered on that edge.
    pub fn resolve_position(&self, half_width: f64, half_length: f64) -> Option<WorldPoint> {
        if let Some(p) = self.position_3d {
            return Some(p);
        }
        let h = self.height;
        let d = self.distance;
        match self.edge {
            CameraEdge::Top => Some(Point3::new(0.0, half_length + d, h)),
            CameraEdge::Bottom => Some(Point3::new(0.0, -(half_length + d), h)),
            CameraEdge::Left => Some(Point3::new(-(half_width + d), 0.0, h)),
            CameraEdge::Right => Some(Point3::new(half_width + d, 0.0, h)),
            CameraEdge::None => None,
        }
    }

    /// Stable fingerprint used as a cache-key modifier.
    pub fn fingerprint(&self) -> u64 {
        let edge = match self.edge {
            CameraEdge::Top => 1u64,
            CameraEdge::Bottom => 2,
            CameraEdge::Left => 3,
            CameraEdge::Right => 4,
            CameraEdge::None => 5,
        };
        let mut acc = edge;
        let mut mix = |v: f64| {
            acc = acc.rotate_left(13) ^ v.to_bits().wrapping_mul(0x9E37_79B9_7F4A_7C15);
        };
        mix(self.distance);
        mix(self.height);
        if let Some(p) = self.position_3d {
            mix(p.x);
            mix(p.y);
            mix(p.z);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn frame_size_normalization_round_trips() {
        let size = FrameSize::new(1920, 1080);
        let px = size.to_pixels(Point2::new(0.25, 0.5));
        assert_eq!(px, Point2::new(480.0, 540.0));
        assert_eq!(size.to_normalized(px), Some(Point2::new(0.25, 0.5)));
        assert_eq!(FrameSize::new(0, 10).to_normalized(px), None);
    }

    #[test]
    fn camera_position_from_edge() {
        let cam = CameraPositionConfig::new(CameraEdge::Bottom, 3.0, 4.0);
        let p = cam.resolve_position(3.05, 6.7).expect("known edge");
        assert_abs_diff_eq!(p.coords, Point3::new(0.0, -9.7, 4.0).coords, epsilon = 1e-12);

        let right = CameraPositionConfig::new(CameraEdge::Right, 2.0, 5.0);
        let p = right.resolve_position(3.05, 6.7).expect("known edge");
        assert_abs_diff_eq!(p.coords, Point3::new(5.05, 0.0, 5.0).coords, epsilon = 1e-12);

        let unknown = CameraPositionConfig::new(CameraEdge::None, 2.0, 5.0);
        assert_eq!(unknown.resolve_position(3.05, 6.7), None);
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let a = CameraPositionConfig::new(CameraEdge::Left, 2.0, 5.0);
        let mut b = a;
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.height = 5.5;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn camera_config_parses_snake_case_edges() {
        let cfg: CameraPositionConfig =
            serde_json::from_str(r#"{"edge":"left","distance":2.0,"height":3.5}"#)
                .expect("parse");
        assert_eq!(cfg.edge, CameraEdge::Left);
        assert!(cfg.position_3d.is_none());
    }
}
