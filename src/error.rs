//! Error type for capture and calibration operations.

use thiserror::Error;

use crate::traits::{FourCC, Property};

/// Error type for capture and calibration operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture source could not be opened. The message names the device or file.
    #[error("{0}")]
    Device(String),
    /// Error during a streaming operation.
    #[error("Stream error: {0}")]
    Stream(String),
    /// The device delivers a pixel format that cannot be converted to BGR8.
    #[error("Pixel format not supported: {0}")]
    UnsupportedFormat(FourCC),
    /// The source refused a property value.
    #[error("Setting {property:?} to {value} failed: {reason}")]
    Property {
        /// Property that was being set.
        property: Property,
        /// Requested value.
        value: f64,
        /// Reason given by the source.
        reason: String,
    },
    /// Calibration URL or file problem.
    #[error("Calibration error: {0}")]
    Calibration(String),
    /// Configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Image decode or encode error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Malformed TOML input.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    /// TOML serialization failure.
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
