//! Error types for Orion

use thiserror::Error;

/// Result type alias for Orion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Orion operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Git operation failed
    #[error("Git error: {0}")]
    Git(String),

    /// Code generation failed or produced unusable output
    #[error("Generation error: {0}")]
    Generation(String),

    /// Test execution failed to run
    #[error("Test error: {0}")]
    Test(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed chat request
    #[error("{0}")]
    Request(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.message().to_string())
    }
}
