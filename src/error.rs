//! Error types for the pix2pix library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Pix2PixError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Pix2PixError {
    /// Invalid model or training configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input spatial size cannot pass through every encoder stage
    #[error("Input resolution {height}x{width} must be divisible by {divisor}")]
    InvalidResolution {
        height: i64,
        width: i64,
        divisor: i64,
    },

    /// Decoder activation and encoder skip do not line up
    #[error("Skip connection mismatch at decoder stage {stage}: activation {activation:?}, skip {skip:?}")]
    SkipMismatch {
        stage: usize,
        activation: Vec<i64>,
        skip: Vec<i64>,
    },

    /// No usable images were found
    #[error("No images found under {0}")]
    EmptyDataset(String),

    /// Image decoding/encoding or tensor operation failed
    #[error("Tensor error: {0}")]
    Tensor(#[from] tch::TchError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
