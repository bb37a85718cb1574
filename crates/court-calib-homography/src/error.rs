/// Errors returned by homography estimation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("not enough usable line correspondences (got {got}, need {needed})")]
    NotEnoughCorrespondences { got: usize, needed: usize },
    #[error("drawn lines use different frame sizes and no target frame was given")]
    MixedFrameSizes,
    #[error("court dimensions are invalid")]
    InvalidCourt,
    #[error("degenerate line configuration: {0}")]
    DegenerateGeometry(String),
    #[error("insufficient geometric diversity: the solved homography is not invertible")]
    InsufficientGeometricDiversity,
    #[error("homography solve failed: {0}")]
    SolveFailed(&'static str),
}
