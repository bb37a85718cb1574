//! Adaptive region-of-interest handling for per-frame pose detection.
//!
//! A [`RoiTracker`] proposes where to crop the next frame,
//! [`crop_video_frame`] cuts that region (never below [`MIN_CROP_PX`]) into a
//! caller-owned scratch image, and [`transform_landmarks_to_full_frame`] maps
//! the detector's crop-relative output back into full-frame normalized
//! coordinates. There is no shared state: every stream owns its tracker and
//! scratch buffer.

mod crop;
mod error;
mod roi;
mod tracker;

pub use crop::{
    crop_rect, crop_video_frame, transform_landmarks_to_full_frame, CropOptions,
    CroppedFrameData, FullFrameLandmarks, MIN_CROP_PX,
};
pub use error::RoiError;
pub use roi::{calculate_roi_coverage, roi_from_landmarks, validate_roi, Roi, MIN_ROI_EXTENT};
pub use tracker::{RoiConfig, RoiTracker, TrackingState};
