/// Hard failures of the crop stage. Everything else is corrected silently.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoiError {
    #[error("frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("frame {width}x{height} is smaller than the minimum crop of {min}px")]
    FrameTooSmall { width: u32, height: u32, min: u32 },
    #[error("model input size must be non-zero (got {width}x{height})")]
    InvalidTargetSize { width: u32, height: u32 },
}
