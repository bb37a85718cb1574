//! High-level facade for the `court-calib-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates under short module names
//! - [`CalibrationSession`], which estimates, validates and activates a
//!   court homography and owns the cached inverse used for every transform
//! - [`FramePipeline`], the per-frame ROI crop → pose model → world loop
//! - JSON config/report helpers and the `court-calib` CLI (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use court_calib::io::{CalibrationConfig, CalibrationReport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CalibrationConfig::load_json("calibration.json")?;
//! let mut session = config.build_session();
//! let validation = session.calibrate(&config.correspondences()?, config.camera)?;
//! println!("score {:.2}", validation.overall_score);
//!
//! if let Some(report) = CalibrationReport::from_session(&session) {
//!     report.write_json(config.output_path())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `court_calib::core`: matrix kernel, inverse cache, homography and shared geometry.
//! - `court_calib::homography`: court model and line-based estimation.
//! - `court_calib::transform`: image/world transforms and the calibration validator.
//! - `court_calib::roi`: ROI tracking, cropping and landmark remapping.

pub use court_calib_core as core;
pub use court_calib_homography as homography;
pub use court_calib_roi as roi;
pub use court_calib_transform as transform;

pub mod io;
mod pipeline;
mod session;
pub mod speed;

pub use court_calib_core::{CameraEdge, CameraPositionConfig, FrameSize, Homography};
pub use court_calib_homography::{CalibrationError, CameraParameters, LineCorrespondence};
pub use court_calib_transform::CoordinateSystemValidation;
pub use pipeline::{FrameOutput, FramePipeline, PipelineError, PoseDetection, PoseModel};
pub use session::{CalibrationSession, SessionError};
pub use speed::{SpeedCalibration, TrajectorySink, WorldSample};
