//! Error types for ROI handling and the ROI store file format.

use thiserror::Error;

/// Errors raised when a region of interest cannot be adjusted or is degenerate.
#[derive(Debug, Error, PartialEq)]
pub enum RoiError {
    /// The ROI has zero height, so its aspect ratio is undefined.
    #[error("ROI ({x}, {y}, {w}, {h}) has zero height; aspect ratio is undefined")]
    ZeroHeight { x: u32, y: u32, w: u32, h: u32 },

    /// The ROI covers no pixels.
    #[error("invalid ROI ({x}, {y}, {w}, {h}): width and height must be greater than 0")]
    Empty { x: u32, y: u32, w: u32, h: u32 },

    /// Target aspect ratio is zero, negative or not finite.
    #[error("invalid aspect ratio {0}: must be a finite number greater than 0")]
    InvalidAspectRatio(f64),
}

/// Errors raised while reading or writing an ROI store file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `ROI1` magic bytes.
    #[error("invalid ROI store: expected magic bytes 'ROI1', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported ROI store version: {0} (supported: 1)")]
    UnsupportedVersion(u32),

    #[error("ROI store serialization error: {0}")]
    Serialize(String),

    #[error("ROI store deserialization error: {0}")]
    Deserialize(String),
}

pub type RoiResult<T> = std::result::Result<T, RoiError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
