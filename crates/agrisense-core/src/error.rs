//! Error types for AgriSense.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The generative model could not be reached, timed out or is not configured.
    #[error("Model service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Model text did not contain the structure a parser expected.
    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Whether the error belongs to the recoverable model-unavailable class.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(Error::ServiceUnavailable("down".into()).is_unavailable());
        assert!(Error::Http("502".into()).is_unavailable());
        assert!(!Error::Config("bad".into()).is_unavailable());
    }

    #[test]
    fn test_display() {
        let err = Error::MalformedModelOutput("no segments".into());
        assert_eq!(err.to_string(), "Malformed model output: no segments");
    }
}
