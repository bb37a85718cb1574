use court_calib_core::{FrameSize, ImagePoint};
use serde::{Deserialize, Serialize};

use crate::court::CourtLine;

/// A user-drawn line in normalized `[0, 1]` image coordinates.
///
/// `frame` records the video dimensions at draw time so the normalized
/// endpoints are always resolved against a known resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawnLine {
    pub start: ImagePoint,
    pub end: ImagePoint,
    pub frame: FrameSize,
}

/// Drawn lines shorter than this (in pixels) carry no direction.
const MIN_DRAWN_LENGTH_PX: f64 = 1.0;

impl DrawnLine {
    pub fn new(start: ImagePoint, end: ImagePoint, frame: FrameSize) -> Self {
        Self { start, end, frame }
    }

    /// Endpoints in pixels of `frame`.
    pub fn pixel_endpoints_in(&self, frame: FrameSize) -> [ImagePoint; 2] {
        [frame.to_pixels(self.start), frame.to_pixels(self.end)]
    }

    /// Endpoints in pixels of the draw-time frame.
    pub fn pixel_endpoints(&self) -> [ImagePoint; 2] {
        self.pixel_endpoints_in(self.frame)
    }

    /// Finite endpoints, a non-empty frame and a visible length.
    pub fn is_usable(&self) -> bool {
        if self.frame.is_empty() {
            return false;
        }
        let finite = [self.start.x, self.start.y, self.end.x, self.end.y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return false;
        }
        let [a, b] = self.pixel_endpoints();
        (b - a).norm() >= MIN_DRAWN_LENGTH_PX
    }
}

/// A known court line paired with the line the user drew over it.
///
/// Endpoint order matters: `drawn.start` is the image of `court.start`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineCorrespondence {
    pub court: CourtLine,
    pub drawn: DrawnLine,
}

impl LineCorrespondence {
    pub fn new(court: CourtLine, drawn: DrawnLine) -> Self {
        Self { court, drawn }
    }
}
