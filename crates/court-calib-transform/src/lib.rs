//! Coordinate transforms between frame pixels and court meters, plus the
//! numerical quality checks run on a fresh calibration.
//!
//! The free functions in [`transformer`] take the homography explicitly and
//! are pure. [`CoordinateTransformer`] keeps the active homography of one
//! session and memoizes its inverse.

mod height;
pub mod transformer;
pub mod validation;

pub use height::{correct_parallax, estimate_height, HeightModel};
pub use transformer::{
    batch_image_to_world, image_to_world, image_to_world_with_inverse, is_valid_homography,
    transform_pose_landmarks, transform_pose_landmarks_scaled, world_to_image,
    CoordinateTransformer, TransformOptions, WorldLandmark, DEFAULT_DEPTH_SCALE,
};
pub use validation::{
    generate_test_points, CalibrationValidator, CoordinateSystemValidation, ValidationResult,
    ValidatorConfig,
};
