use court_calib_core::PoseLandmark;
use serde::{Deserialize, Serialize};

use crate::roi::{calculate_roi_coverage, roi_from_landmarks, Roi};

/// Where the tracker believes the subject is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// No landmarks seen yet; the ROI is the full frame.
    #[default]
    Uninitialized,
    /// ROI follows the landmark bounding box.
    Tracking,
    /// Coverage dropped (fast motion); the ROI was widened.
    Expanded,
    /// Too many frames without landmarks; back to the full frame.
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Padding applied about the landmark bounding box.
    pub padding: f64,
    /// Coverage below which the next ROI is widened.
    pub min_coverage: f64,
    pub expansion_factor: f64,
    /// Consecutive frames without landmarks before the track is lost.
    pub max_missed_frames: u32,
    pub min_visible_landmarks: usize,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            padding: 1.25,
            min_coverage: 0.6,
            expansion_factor: 1.5,
            max_missed_frames: 5,
            min_visible_landmarks: 2,
        }
    }
}

/// Adaptive ROI for one video stream.
///
/// Each tracker is an independent value; run one per stream.
#[derive(Clone, Debug, Default)]
pub struct RoiTracker {
    config: RoiConfig,
    roi: Roi,
    state: TrackingState,
    missed_frames: u32,
}

impl RoiTracker {
    pub fn new(config: RoiConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// ROI to crop the next frame with.
    pub fn roi(&self) -> Roi {
        self.roi
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    pub fn reset(&mut self) {
        self.set_state(TrackingState::Uninitialized);
        self.roi = Roi::full();
        self.missed_frames = 0;
    }

    /// Feed the full-frame landmarks of the frame just processed and return
    /// the ROI for the next one.
    pub fn update(&mut self, landmarks: &[PoseLandmark]) -> Roi {
        let cfg = self.config;
        let Some(bbox) = roi_from_landmarks(landmarks, cfg.min_visible_landmarks, cfg.padding) else {
            self.missed_frames = self.missed_frames.saturating_add(1);
            if self.missed_frames >= cfg.max_missed_frames && self.state != TrackingState::Uninitialized {
                self.set_state(TrackingState::Lost);
                self.roi = Roi::full();
            }
            return self.roi;
        };
        self.missed_frames = 0;

        let following = matches!(self.state, TrackingState::Tracking | TrackingState::Expanded);
        let coverage = calculate_roi_coverage(landmarks, &self.roi);
        if following && coverage < cfg.min_coverage {
            log::debug!("ROI coverage {coverage:.2} below {:.2}, expanding", cfg.min_coverage);
            self.roi = bbox.scaled(cfg.expansion_factor);
            self.set_state(TrackingState::Expanded);
        } else {
            self.roi = bbox;
            self.set_state(TrackingState::Tracking);
        }
        self.roi
    }

    fn set_state(&mut self, next: TrackingState) {
        if self.state != next {
            log::debug!("ROI tracker {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
