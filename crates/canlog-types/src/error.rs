//! Error types for model conversions in canlog-types.

use thiserror::Error;

/// Errors that can occur when converting raw values into model types.
///
/// This error type is transport-agnostic and does not include
/// HTTP-specific errors (those belong in canlog-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The bus bitrate is not one the device supports.
    #[error("Unsupported bitrate: {0} bit/s")]
    UnsupportedBitrate(u32),

    /// A file filter string did not name a bus or "all".
    #[error("Invalid file filter: {0}")]
    InvalidFilter(String),
}
