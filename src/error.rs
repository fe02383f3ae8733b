//! Error types for repository configuration and resolver construction

use thiserror::Error;

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

/// Errors that can occur while configuring repositories or building resolvers
#[derive(Debug, Error)]
pub enum RepoError {
    /// A required configuration field was absent at resolver-build time
    #[error("Missing configuration for repository '{repository}': {message}")]
    MissingConfiguration { repository: String, message: String },

    /// A retention value outside the accepted range
    #[error("Invalid retention setting: {0}")]
    InvalidRetention(String),

    /// A URL or path token could not be resolved to an absolute URL
    #[error("Invalid location '{token}': {message}")]
    InvalidLocation { token: String, message: String },

    /// A metadata descriptor could not be parsed
    #[error("Failed to parse {format} metadata in repository '{repository}': {message}")]
    MetadataParse {
        repository: String,
        format: String,
        message: String,
    },

    /// I/O error from a file store or file transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// File store error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration file parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RepoError {
    fn from(err: reqwest::Error) -> Self {
        RepoError::Http(err.to_string())
    }
}

impl From<toml::de::Error> for RepoError {
    fn from(err: toml::de::Error) -> Self {
        RepoError::Parse(err.to_string())
    }
}
