//! Error types for canlog-core.
//!
//! Every request to the device either succeeds or fails with one of the
//! variants below. HTTP failures are uniform: a non-success status becomes
//! [`Error::RequestFailed`] and the response body is not inspected.
//!
//! Components never propagate errors out of a user action or timer tick.
//! They turn them into transient notices (see [`crate::notice`]) and keep
//! running. The variants are still useful to callers that drive the
//! [`crate::ApiClient`] directly, such as the CLI.

use thiserror::Error;

/// Errors that can occur when talking to the data logger.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The device answered with a non-success HTTP status.
    #[error("Request failed: {status}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response.
    #[error("Device not reachable at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The device URL is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// User input was rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// An operation needed the configuration mirror before the first load.
    #[error("Configuration not loaded")]
    NotLoaded,

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A model value could not be converted.
    #[error(transparent)]
    Model(#[from] canlog_types::ParseError),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transport error for `url`.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// HTTP status of a failed request, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using canlog-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RequestFailed { status: 401 };
        assert_eq!(err.to_string(), "Request failed: 401");
        assert_eq!(err.status(), Some(401));

        let err = Error::validation("Select files first");
        assert_eq!(err.to_string(), "Select files first");
        assert_eq!(err.status(), None);

        let err = Error::NotLoaded;
        assert_eq!(err.to_string(), "Configuration not loaded");
    }

    #[test]
    fn test_error_from_parse_error() {
        let err: Error = canlog_types::ParseError::UnsupportedBitrate(42).into();
        assert!(err.to_string().contains("42"));
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("Invalid response"));
    }
}
