//! Court-line homography estimation.
//!
//! Given at least three court lines the user traced over a video frame,
//! [`HomographyEstimator`] solves the planar homography that maps court
//! coordinates (meters, origin at the net center) into frame pixels.
//!
//! ```
//! use court_calib_core::{FrameSize, Homography};
//! use court_calib_homography::{
//!     calculate_camera_parameters, CourtLineKind, CourtModel, CourtSide, DrawnLine,
//!     EstimatorParams, LineCorrespondence,
//! };
//!
//! let frame = FrameSize::new(1920, 1080);
//! let truth = Homography::from_array([[75.0, 0.0, 960.0], [0.0, -75.0, 540.0], [0.0, 0.0, 1.0]]);
//! let model = CourtModel::default();
//! let corr: Vec<LineCorrespondence> = [
//!     (CourtLineKind::CenterLine, CourtSide::Near),
//!     (CourtLineKind::ServiceShort, CourtSide::Near),
//!     (CourtLineKind::Sideline, CourtSide::Left),
//! ]
//! .iter()
//! .map(|&(kind, side)| {
//!     let line = model.line(kind, side).unwrap();
//!     let a = frame.to_normalized(truth.apply(line.start.xy()).unwrap()).unwrap();
//!     let b = frame.to_normalized(truth.apply(line.end.xy()).unwrap()).unwrap();
//!     LineCorrespondence::new(line, DrawnLine::new(a, b, frame))
//! })
//! .collect();
//!
//! let params = calculate_camera_parameters(&corr, None, &EstimatorParams::default()).unwrap();
//! assert!(params.reprojection_error_px < 1e-6);
//! ```

mod correspondence;
mod court;
pub mod dlt;
mod error;
mod estimator;

pub use correspondence::{DrawnLine, LineCorrespondence};
pub use court::{CourtDimensions, CourtLine, CourtLineKind, CourtModel, CourtSide};
pub use error::CalibrationError;
pub use estimator::{
    calculate_camera_parameters, AnchorResidual, CameraParameters, EstimatorParams,
    HomographyEstimator, MIN_CORRESPONDENCES,
};
