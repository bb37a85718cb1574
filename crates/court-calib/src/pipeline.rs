//! Per-frame ROI → pose → world pipeline.

use std::fmt::Display;

use court_calib_core::{ModelWorldLandmark, PoseLandmark};
use court_calib_roi::{
    crop_video_frame, transform_landmarks_to_full_frame, CropOptions, CroppedFrameData,
    FullFrameLandmarks, Roi, RoiConfig, RoiError, RoiTracker,
};
use court_calib_transform::WorldLandmark;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::session::{CalibrationSession, SessionError};
use crate::speed::{TrajectorySink, WorldSample};

/// Output of the external pose model for one crop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDetection {
    /// Normalized to the crop.
    pub landmarks: Vec<PoseLandmark>,
    #[serde(default)]
    pub world_landmarks: Vec<ModelWorldLandmark>,
}

/// Black-box pose detector: crop in, crop-normalized landmarks out.
pub trait PoseModel {
    type Error: Display;

    fn detect(&mut self, crop: &RgbImage) -> Result<PoseDetection, Self::Error>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Roi(#[from] RoiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result of the most recent successfully processed frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub timestamp_s: f64,
    pub crop: CroppedFrameData,
    pub landmarks: FullFrameLandmarks,
    pub world: Vec<WorldLandmark>,
}

/// Drives one video stream through crop, detection, remap and the world
/// transform.
///
/// Owns its ROI tracker and crop buffer, so several pipelines can run side
/// by side. A frame whose detection or transform fails leaves the previous
/// output in place.
#[derive(Debug)]
pub struct FramePipeline<M> {
    model: M,
    tracker: RoiTracker,
    crop_options: CropOptions,
    scratch: RgbImage,
    /// Height added to every landmark, meters.
    world_z: f64,
    last: Option<FrameOutput>,
}

impl<M: PoseModel> FramePipeline<M> {
    pub fn new(model: M, roi: RoiConfig, crop_options: CropOptions) -> Self {
        Self {
            model,
            tracker: RoiTracker::new(roi),
            crop_options,
            scratch: RgbImage::new(0, 0),
            world_z: 0.0,
            last: None,
        }
    }

    pub fn with_world_z(mut self, world_z: f64) -> Self {
        self.world_z = world_z;
        self
    }

    pub fn tracker(&self) -> &RoiTracker {
        &self.tracker
    }

    /// ROI the next frame will be cropped with.
    pub fn roi(&self) -> Roi {
        self.tracker.roi()
    }

    pub fn last_output(&self) -> Option<&FrameOutput> {
        self.last.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Process one frame and return the latest known output.
    ///
    /// Only crop preconditions and a missing calibration are errors.
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        timestamp_s: f64,
        session: &mut CalibrationSession,
        sink: &mut dyn TrajectorySink,
    ) -> Result<Option<&FrameOutput>, PipelineError> {
        let calibration_frame = session
            .parameters()
            .map(|p| p.frame)
            .ok_or(SessionError::NotCalibrated)?;

        let roi = self.tracker.roi();
        let crop = crop_video_frame(frame, &roi, &mut self.scratch, &self.crop_options)?;

        let detection = match self.model.detect(&self.scratch) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("pose model failed at t={timestamp_s:.3}s: {e}");
                return Ok(self.last.as_ref());
            }
        };

        let full = transform_landmarks_to_full_frame(&detection.landmarks, &detection.world_landmarks, &crop);
        self.tracker.update(&full.landmarks);

        let pixels: Vec<PoseLandmark> = full
            .landmarks
            .iter()
            .map(|lm| lm.to_pixels(calibration_frame))
            .collect();
        let world = session.transform_pose_landmarks(&pixels, self.world_z)?;
        if world.iter().all(|w| w.position.is_none()) {
            log::debug!("no landmark mapped to the court at t={timestamp_s:.3}s");
            return Ok(self.last.as_ref());
        }

        sink.push(WorldSample {
            timestamp_s,
            landmarks: world.clone(),
        });
        let output = self.last.insert(FrameOutput {
            timestamp_s,
            crop,
            landmarks: full,
            world,
        });
        Ok(Some(&*output))
    }
}
