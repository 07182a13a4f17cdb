//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Repository URL could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The API refused to open the pull request
    #[error("Pull request rejected: {0}")]
    Rejected(String),
}

impl From<Error> for orion_core::Error {
    fn from(err: Error) -> Self {
        orion_core::Error::Other(err.to_string())
    }
}
