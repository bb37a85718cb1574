//! Core types for court calibration.
//!
//! This crate is purely geometric: a closed-form 3×3 kernel, a memoized
//! inverse cache, the [`Homography`] value type and the small vocabulary
//! (frame sizes, camera priors, pose landmarks) shared by the other crates.
//! It does not know about court layouts or pixel buffers.

mod cache;
mod geometry;
mod homography;
mod landmark;
mod logger;
pub mod matrix;

pub use cache::{CacheStats, InverseCache, MatrixKey};
pub use geometry::{CameraEdge, CameraPositionConfig, FrameSize, ImagePoint, WorldPoint};
pub use homography::{apply_matrix, Homography};
pub use landmark::{ModelWorldLandmark, PoseLandmark, VISIBILITY_THRESHOLD};
pub use matrix::{Mat3, SINGULAR_EPS};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
