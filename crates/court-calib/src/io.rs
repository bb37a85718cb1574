//! JSON configuration and report helpers.

use court_calib_core::{CameraPositionConfig, FrameSize, ImagePoint};
use court_calib_homography::{
    CameraParameters, CourtLineKind, CourtModel, CourtSide, DrawnLine, EstimatorParams,
    LineCorrespondence,
};
use court_calib_roi::{CropOptions, RoiConfig};
use court_calib_transform::{CoordinateSystemValidation, TransformOptions, ValidatorConfig};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::session::CalibrationSession;
use crate::speed::SpeedCalibration;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("court has no {kind:?} line on the {side:?} side")]
    UnknownCourtLine { kind: CourtLineKind, side: CourtSide },
    #[error("line {index} has no frame size and the config sets none")]
    MissingFrame { index: usize },
}

/// Read and parse a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write `value` as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// A traced court line as stored in a config file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub kind: CourtLineKind,
    pub side: CourtSide,
    /// Normalized image position of the court line's start point.
    pub start: ImagePoint,
    pub end: ImagePoint,
    /// Draw-time frame; falls back to [`CalibrationConfig::frame`].
    #[serde(default)]
    pub frame: Option<FrameSize>,
}

/// Everything needed to calibrate one video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub frame: Option<FrameSize>,
    pub lines: Vec<LineAnnotation>,
    #[serde(default)]
    pub camera: Option<CameraPositionConfig>,
    #[serde(default)]
    pub estimator: EstimatorParams,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub transform: TransformOptions,
    #[serde(default)]
    pub roi: RoiConfig,
    #[serde(default)]
    pub crop: CropOptions,
    #[serde(default)]
    pub speed: Option<SpeedCalibration>,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl CalibrationConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_json(self, path)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("court_calib_report.json"))
    }

    /// Resolve every annotation against the configured court.
    pub fn correspondences(&self) -> Result<Vec<LineCorrespondence>, ConfigError> {
        let model = CourtModel::new(self.estimator.court);
        self.lines
            .iter()
            .enumerate()
            .map(|(index, a)| {
                let court = model.line(a.kind, a.side).ok_or(ConfigError::UnknownCourtLine {
                    kind: a.kind,
                    side: a.side,
                })?;
                let frame = a
                    .frame
                    .or(self.frame)
                    .ok_or(ConfigError::MissingFrame { index })?;
                Ok(LineCorrespondence::new(court, DrawnLine::new(a.start, a.end, frame)))
            })
            .collect()
    }

    /// Session configured from this file, not yet calibrated.
    pub fn build_session(&self) -> CalibrationSession {
        let mut estimator = self.estimator.clone();
        if estimator.frame.is_none() {
            estimator.frame = self.frame;
        }
        let mut transform = self.transform;
        transform.court = estimator.court;
        CalibrationSession::new(estimator, self.validator, transform)
    }
}

/// What `calibrate` writes: the solved camera and its quality checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub parameters: CameraParameters,
    pub validation: CoordinateSystemValidation,
    pub needs_recalibration: bool,
    /// Options the session transformed with; needed to reproduce its
    /// camera-aware projections.
    #[serde(default)]
    pub transform: TransformOptions,
}

impl CalibrationReport {
    pub fn from_session(session: &CalibrationSession) -> Option<Self> {
        let parameters = session.parameters()?.clone();
        let validation = session.validation()?.clone();
        Some(Self {
            needs_recalibration: validation.needs_recalibration(),
            parameters,
            validation,
            transform: *session.transformer().options(),
        })
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write_json(self, path)
    }
}
