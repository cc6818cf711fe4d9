//! Error types for gcpadm

use thiserror::Error;

/// Result type alias for gcpadm operations
pub type Result<T> = std::result::Result<T, GcpError>;

/// Errors surfaced by the library
#[derive(Debug, Error)]
pub enum GcpError {
    /// Non-2xx response from a Google API
    #[error("API request failed: {status} {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local admin profile is missing, incomplete, or inconsistent
    #[error("{0}")]
    AdminCredentials(String),

    /// An API display name could not be resolved to exactly one service id
    #[error("{0}")]
    ApiResolution(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation makes no sense for this resource (e.g. folders under NO_ORG)
    #[error("{0}")]
    Unsupported(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation failed with error code {code}: {message}")]
    OperationFailed { code: i64, message: String },

    #[error("{0}")]
    GCloud(String),

    #[error("Interactive prompt error: {0}")]
    Prompt(String),
}

impl GcpError {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            GcpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 404, and for the 403 Google returns for resources the caller cannot see
    pub fn is_absent(&self) -> bool {
        matches!(self.status(), Some(403) | Some(404))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<gcp_auth::Error> for GcpError {
    fn from(err: gcp_auth::Error) -> Self {
        GcpError::Auth(err.to_string())
    }
}

impl From<dialoguer::Error> for GcpError {
    fn from(err: dialoguer::Error) -> Self {
        GcpError::Prompt(err.to_string())
    }
}
