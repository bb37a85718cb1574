//! Hand-off types for the downstream speed calculator.
//!
//! The calculator itself lives elsewhere; this module only fixes the
//! configuration it is given and the shape of the world-space samples the
//! frame pipeline pushes into it.

use court_calib_core::{ImagePoint, WorldPoint, VISIBILITY_THRESHOLD};
use court_calib_homography::CourtDimensions;
use court_calib_transform::WorldLandmark;
use serde::{Deserialize, Serialize};

fn default_player_height_m() -> f64 {
    1.75
}

/// An image location with a surveyed court position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    #[serde(default)]
    pub label: Option<String>,
    pub image: ImagePoint,
    pub world: WorldPoint,
}

/// Plain configuration record for the speed calculator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedCalibration {
    #[serde(default = "default_player_height_m")]
    pub player_height_m: f64,
    #[serde(default)]
    pub court: CourtDimensions,
    #[serde(default)]
    pub reference_points: Vec<ReferencePoint>,
}

impl Default for SpeedCalibration {
    fn default() -> Self {
        Self {
            player_height_m: default_player_height_m(),
            court: CourtDimensions::default(),
            reference_points: Vec::new(),
        }
    }
}

/// World-space landmarks of one processed frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSample {
    pub timestamp_s: f64,
    pub landmarks: Vec<WorldLandmark>,
}

impl WorldSample {
    /// Mean position of the visible, finite landmarks.
    pub fn centroid(&self) -> Option<WorldPoint> {
        let (sum, n) = self
            .landmarks
            .iter()
            .filter(|lm| lm.visibility > VISIBILITY_THRESHOLD)
            .filter_map(|lm| lm.position)
            .fold((WorldPoint::origin().coords, 0usize), |(acc, n), p| {
                (acc + p.coords, n + 1)
            });
        (n > 0).then(|| WorldPoint::from(sum / n as f64))
    }
}

/// Receiver of world-space samples, one per successfully processed frame.
pub trait TrajectorySink {
    fn push(&mut self, sample: WorldSample);
}

impl TrajectorySink for Vec<WorldSample> {
    fn push(&mut self, sample: WorldSample) {
        Vec::push(self, sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn centroid_ignores_hidden_and_failed_landmarks() {
        let sample = WorldSample {
            timestamp_s: 0.5,
            landmarks: vec![
                WorldLandmark {
                    position: Some(WorldPoint::new(1.0, 2.0, 1.0)),
                    visibility: 0.9,
                },
                WorldLandmark {
                    position: Some(WorldPoint::new(3.0, 4.0, 1.0)),
                    visibility: 0.8,
                },
                WorldLandmark {
                    position: Some(WorldPoint::new(100.0, 100.0, 0.0)),
                    visibility: 0.1,
                },
                WorldLandmark {
                    position: None,
                    visibility: 0.9,
                },
            ],
        };
        let c = sample.centroid().expect("two usable landmarks");
        assert_abs_diff_eq!(c.x, 2.0);
        assert_abs_diff_eq!(c.y, 3.0);
        assert_abs_diff_eq!(c.z, 1.0);
    }

    #[test]
    fn config_defaults_from_empty_json() {
        let cfg: SpeedCalibration = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, SpeedCalibration::default());
        assert_eq!(cfg.player_height_m, 1.75);
    }

    #[test]
    fn vec_sink_collects() {
        let mut sink: Vec<WorldSample> = Vec::new();
        TrajectorySink::push(
            &mut sink,
            WorldSample {
                timestamp_s: 0.0,
                landmarks: Vec::new(),
            },
        );
        assert_eq!(sink.len(), 1);
        assert!(sink[0].centroid().is_none());
    }
}
