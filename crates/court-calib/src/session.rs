use court_calib_core::{CameraPositionConfig, ImagePoint, PoseLandmark, WorldPoint};
use court_calib_homography::{
    CalibrationError, CameraParameters, EstimatorParams, HomographyEstimator, LineCorrespondence,
};
use court_calib_transform::{
    CalibrationValidator, CoordinateSystemValidation, CoordinateTransformer, TransformOptions,
    ValidatorConfig, WorldLandmark,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors returned by [`CalibrationSession`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("solved homography failed the validity check")]
    InvalidHomography,
    #[error("no active calibration")]
    NotCalibrated,
}

/// Calibration state of one video: estimator, validator and the transformer
/// holding the active homography.
///
/// Re-calibrating replaces the homography and drops every cached inverse.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSession {
    estimator: HomographyEstimator,
    validator: CalibrationValidator,
    transformer: CoordinateTransformer,
    parameters: Option<CameraParameters>,
    validation: Option<CoordinateSystemValidation>,
}

impl CalibrationSession {
    pub fn new(estimator: EstimatorParams, validator: ValidatorConfig, transform: TransformOptions) -> Self {
        Self {
            estimator: HomographyEstimator::new(estimator),
            validator: CalibrationValidator::new(validator),
            transformer: CoordinateTransformer::new(transform),
            parameters: None,
            validation: None,
        }
    }

    /// Estimate, validate and activate a homography.
    ///
    /// A calibration that solves but scores poorly is still activated; check
    /// [`CoordinateSystemValidation::needs_recalibration`] on the result.
    /// On error the previous calibration is cleared.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, correspondences, camera), fields(lines = correspondences.len()))
    )]
    pub fn calibrate(
        &mut self,
        correspondences: &[LineCorrespondence],
        camera: Option<CameraPositionConfig>,
    ) -> Result<&CoordinateSystemValidation, SessionError> {
        self.clear();
        let params = self.estimator.estimate(correspondences, camera.as_ref())?;
        let validation = self.validator.validate(&params.homography, params.frame, None);
        if !self.transformer.set_homography(params.homography, camera) {
            return Err(SessionError::InvalidHomography);
        }
        log::info!(
            "calibrated from {} anchors: rms {:.3} px, confidence {:.2}, score {:.2}",
            params.point_count(),
            params.reprojection_error_px,
            params.confidence,
            validation.overall_score
        );
        self.parameters = Some(params);
        let validation = self.validation.insert(validation);
        Ok(&*validation)
    }

    /// Forget the active calibration.
    pub fn clear(&mut self) {
        self.transformer.clear();
        self.parameters = None;
        self.validation = None;
    }

    pub fn is_calibrated(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn parameters(&self) -> Option<&CameraParameters> {
        self.parameters.as_ref()
    }

    pub fn validation(&self) -> Option<&CoordinateSystemValidation> {
        self.validation.as_ref()
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    pub fn image_to_world(&mut self, point: ImagePoint, z: Option<f64>) -> Result<Option<WorldPoint>, SessionError> {
        self.ensure_calibrated()?;
        Ok(self.transformer.image_to_world(point, z))
    }

    pub fn world_to_image(&self, point: &WorldPoint) -> Result<Option<ImagePoint>, SessionError> {
        self.ensure_calibrated()?;
        Ok(self.transformer.world_to_image(point))
    }

    /// Landmarks must be in pixels of the calibration frame.
    pub fn transform_pose_landmarks(
        &mut self,
        landmarks: &[PoseLandmark],
        world_z: f64,
    ) -> Result<Vec<WorldLandmark>, SessionError> {
        self.ensure_calibrated()?;
        Ok(self.transformer.transform_pose_landmarks(landmarks, world_z))
    }

    fn ensure_calibrated(&self) -> Result<(), SessionError> {
        if self.parameters.is_some() {
            Ok(())
        } else {
            Err(SessionError::NotCalibrated)
        }
    }
}
