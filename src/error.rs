//! Error types for the hydration pipeline

use thiserror::Error;

/// Result type alias for hydration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, mapping, or rendering content
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// The content API answered with a non-success status
    #[error("HTTP error! status: {status}, message: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response body was not the JSON shape we expect
    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    /// The request succeeded but carried no usable records
    #[error("Content API returned no usable records")]
    EmptyResult,

    /// The run was cancelled before it could complete
    #[error("Hydration cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to write content into the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// I/O error while reading pages or content dumps
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to the network-failure class.
    ///
    /// Status errors, transport errors and undecodable bodies are all treated
    /// the same way by the pipeline.
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::HttpStatus { .. } | Error::MalformedBody(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedBody(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::ConfigError(format!("invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_class_covers_status_and_body_errors() {
        assert!(Error::Network("reset".into()).is_network_failure());
        assert!(Error::HttpStatus { status: 500, body: String::new() }.is_network_failure());
        assert!(Error::MalformedBody("eof".into()).is_network_failure());
        assert!(!Error::EmptyResult.is_network_failure());
        assert!(!Error::Cancelled.is_network_failure());
    }

    #[test]
    fn status_error_message_includes_body() {
        let err = Error::HttpStatus { status: 401, body: "invalid key".into() };
        assert_eq!(err.to_string(), "HTTP error! status: 401, message: invalid key");
    }
}
