// src/error.rs

use thiserror::Error;

/// Core error types for the update tool
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure talking to the remote catalog
    #[error("connection to the remote server failed")]
    Connection,

    /// Transport failure while a proxy is configured
    #[error("connection to the remote server through proxy server failed")]
    ProxyConnection,

    /// Non-success response that is not a not-found case
    #[error("server request failed: {0}")]
    Server(String),

    /// Distribution absent on the server
    #[error("distribution '{0}' not found")]
    DistributionNotFound(String),

    /// Version token unknown to the catalog entirely
    #[error("'{0}' is not a valid distribution")]
    InvalidDistribution(String),

    /// Version is in the catalog but not installed locally
    #[error("distribution '{0}' is not found locally. Run 'bal-update pull {0}' to fetch it")]
    NotInstalled(String),

    /// Dependency bundle absent on the server
    #[error("dependency '{0}' not found")]
    DependencyNotFound(String),

    /// Update tool archive absent on the server
    #[error("tool version '{0}' not found")]
    ToolVersionNotFound(String),

    /// Refusal to remove the distribution named by the active pointer
    #[error("the active distribution cannot be removed")]
    ActiveDistributionRemoval,

    /// Dependency missing after the distribution archive was extracted
    #[error("no runtime dependency is associated with '{0}'. Please try pulling the distribution again")]
    DependencyUnavailable(String),

    /// Install root not writable, checked before any mutating operation
    #[error("permission denied: you do not have write access to '{0}'")]
    PermissionDenied(String),

    /// Another invocation holds the install-root lock
    #[error("another update operation is in progress (remove '{0}' if no other instance is running)")]
    Locked(String),

    /// Malformed invocation; rendered with a help hint at the CLI boundary
    #[error("{0}")]
    Usage(String),

    /// Unusable proxy configuration in Settings.toml
    #[error("invalid proxy settings: {0}")]
    Settings(String),

    /// Archive did not have the layout the catalog promised
    #[error("unexpected archive layout: {0}")]
    BadArchive(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed catalog payload
    #[error("failed to parse the server response: {0}")]
    Json(#[from] serde_json::Error),

    /// Corrupt or unreadable zip archive
    #[error("failed to unzip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    /// Usage errors get a "run help" hint when rendered by the CLI.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

/// Result type alias using the update tool's Error type
pub type Result<T> = std::result::Result<T, Error>;
