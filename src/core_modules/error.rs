//! Errors reported at the detector's API boundary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("invalid image dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("row stride {stride} is smaller than the image width {width}")]
    InvalidStride { stride: usize, width: u32 },

    #[error("region of interest {x},{y} {width}x{height} lies outside a {image_width}x{image_height} image")]
    RoiOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("pixel buffer holds {actual} bytes but the configured frame needs exactly {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}
