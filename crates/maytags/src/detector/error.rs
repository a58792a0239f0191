use maytags_family::FamilyError;

/// Configuration errors raised while building a detector.
#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    #[error("no tag family configured")]
    NoFamilies,
    #[error(transparent)]
    Family(#[from] FamilyError),
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Input contract violations rejected at detection entry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: usize, height: usize },

    #[error("unsupported pixel format {format} (expected 8-bit single channel)")]
    UnsupportedPixelFormat { format: String },
}
