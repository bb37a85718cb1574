//! Court geometry in meters.
//!
//! The coordinate system is centered on the net: `x` runs across the court
//! (sideline to sideline), `y` along it (baseline to baseline), `z` is up.
//! The near half of the court is `y < 0`.

use court_calib_core::WorldPoint;
use serde::{Deserialize, Serialize};

/// Playing-surface dimensions. Defaults to a badminton doubles court.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourtDimensions {
    /// Doubles width, sideline to sideline.
    pub width: f64,
    /// Baseline to baseline.
    pub length: f64,
    /// Distance of the short service line from the net.
    pub short_service_from_net: f64,
    /// Distance of the doubles long service line from the baseline.
    pub long_service_from_baseline: f64,
    /// Distance of the singles sideline inside the doubles sideline.
    pub singles_inset: f64,
}

impl Default for CourtDimensions {
    fn default() -> Self {
        Self::badminton_doubles()
    }
}

impl CourtDimensions {
    pub fn badminton_doubles() -> Self {
        Self {
            width: 6.1,
            length: 13.4,
            short_service_from_net: 1.98,
            long_service_from_baseline: 0.76,
            singles_inset: 0.46,
        }
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    #[inline]
    pub fn half_length(&self) -> f64 {
        self.length / 2.0
    }

    /// Basic sanity: positive extents, service lines inside the half court.
    pub fn is_valid(&self) -> bool {
        let finite = [
            self.width,
            self.length,
            self.short_service_from_net,
            self.long_service_from_baseline,
            self.singles_inset,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
        finite
            && self.width > 0.0
            && self.length > 0.0
            && self.short_service_from_net + self.long_service_from_baseline < self.half_length()
            && self.singles_inset < self.half_width()
    }
}

/// Semantic court line type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourtLineKind {
    /// Divides the left and right service courts, short service line to baseline.
    CenterLine,
    ServiceShort,
    /// Doubles long service line.
    ServiceLong,
    Baseline,
    /// Doubles sideline, full court length.
    Sideline,
    SinglesSideline,
    Net,
}

/// Which instance of a line kind is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtSide {
    /// `y < 0` half.
    Near,
    /// `y > 0` half.
    Far,
    /// `x < 0` side.
    Left,
    /// `x > 0` side.
    Right,
    /// Lines that have a single instance (the net).
    Middle,
}

/// A named line segment on the court plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourtLine {
    pub kind: CourtLineKind,
    pub side: CourtSide,
    pub start: WorldPoint,
    pub end: WorldPoint,
}

impl CourtLine {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Court line lookup for one set of dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CourtModel {
    pub dims: CourtDimensions,
}

impl CourtModel {
    pub fn new(dims: CourtDimensions) -> Self {
        Self { dims }
    }

    /// Resolve a line by kind and side.
    ///
    /// Returns `None` for combinations that do not exist, e.g. a sideline on
    /// the `Near` side or a baseline on the `Left`.
    pub fn line(&self, kind: CourtLineKind, side: CourtSide) -> Option<CourtLine> {
        let d = &self.dims;
        let hw = d.half_width();
        let hl = d.half_length();

        let across = |y: f64| (WorldPoint::new(-hw, y, 0.0), WorldPoint::new(hw, y, 0.0));
        let along = |x: f64| (WorldPoint::new(x, -hl, 0.0), WorldPoint::new(x, hl, 0.0));
        let sign = match side {
            CourtSide::Near | CourtSide::Left => -1.0,
            CourtSide::Far | CourtSide::Right => 1.0,
            CourtSide::Middle => 0.0,
        };
        let is_end_side = matches!(side, CourtSide::Near | CourtSide::Far);
        let is_flank_side = matches!(side, CourtSide::Left | CourtSide::Right);

        let (start, end) = match kind {
            CourtLineKind::CenterLine if is_end_side => (
                WorldPoint::new(0.0, sign * d.short_service_from_net, 0.0),
                WorldPoint::new(0.0, sign * hl, 0.0),
            ),
            CourtLineKind::ServiceShort if is_end_side => across(sign * d.short_service_from_net),
            CourtLineKind::ServiceLong if is_end_side => {
                across(sign * (hl - d.long_service_from_baseline))
            }
            CourtLineKind::Baseline if is_end_side => across(sign * hl),
            CourtLineKind::Sideline if is_flank_side => along(sign * hw),
            CourtLineKind::SinglesSideline if is_flank_side => {
                along(sign * (hw - d.singles_inset))
            }
            CourtLineKind::Net if side == CourtSide::Middle => across(0.0),
            _ => return None,
        };

        Some(CourtLine {
            kind,
            side,
            start,
            end,
        })
    }

    /// True when `p` lies within `factor` times the court half extents.
    pub fn contains(&self, p: &WorldPoint, factor: f64) -> bool {
        p.x.abs() <= self.dims.half_width() * factor && p.y.abs() <= self.dims.half_length() * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn badminton_defaults() {
        let dims = CourtDimensions::default();
        assert!(dims.is_valid());
        assert_abs_diff_eq!(dims.half_width(), 3.05);
        assert_abs_diff_eq!(dims.half_length(), 6.7);
    }

    #[test]
    fn service_lines_sit_where_expected() {
        let model = CourtModel::default();
        let short = model
            .line(CourtLineKind::ServiceShort, CourtSide::Far)
            .expect("far short service");
        assert_abs_diff_eq!(short.start.y, 1.98);
        assert_abs_diff_eq!(short.length(), 6.1, epsilon = 1e-12);

        let long = model
            .line(CourtLineKind::ServiceLong, CourtSide::Near)
            .expect("near long service");
        assert_abs_diff_eq!(long.start.y, -5.94, epsilon = 1e-12);

        let center = model
            .line(CourtLineKind::CenterLine, CourtSide::Near)
            .expect("near center line");
        assert_abs_diff_eq!(center.length(), 6.7 - 1.98, epsilon = 1e-12);
        assert_eq!(center.start.x, 0.0);
    }

    #[test]
    fn impossible_combinations_are_none() {
        let model = CourtModel::default();
        assert!(model.line(CourtLineKind::Sideline, CourtSide::Near).is_none());
        assert!(model.line(CourtLineKind::Baseline, CourtSide::Left).is_none());
        assert!(model.line(CourtLineKind::Net, CourtSide::Far).is_none());
        assert!(model.line(CourtLineKind::Net, CourtSide::Middle).is_some());
    }

    #[test]
    fn line_kinds_use_kebab_case() {
        let json = serde_json::to_string(&CourtLineKind::ServiceShort).expect("serialize");
        assert_eq!(json, "\"service-short\"");
        let kind: CourtLineKind = serde_json::from_str("\"center-line\"").expect("parse");
        assert_eq!(kind, CourtLineKind::CenterLine);
    }

    #[test]
    fn containment_scales_with_factor() {
        let model = CourtModel::default();
        let p = WorldPoint::new(4.0, 0.0, 0.0);
        assert!(!model.contains(&p, 1.0));
        assert!(model.contains(&p, 2.0));
    }
}
