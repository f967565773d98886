//! Error handling for the Orbit Learn client

use std::fmt;
use thiserror::Error;

/// Unified error type for the Orbit Learn client
#[derive(Error, Debug)]
pub enum Error {
    /// Client-side input check failed; nothing was sent
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Credentials rejected, or the server answered 401
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Server answered `success: false` with a 2xx status
    #[error("{0}")]
    Rejected(String),

    /// Refresh failed and the session was cleared
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Server answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The session has not been restored or signed in yet
    #[error("Session not initialized")]
    NotInitialized,

    /// Network or HTTP transport errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] orbit_learn_storage::StorageError),

    /// Parent PIN errors
    #[error("Mode error: {0}")]
    Mode(#[from] orbit_learn_mode::ModeError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(field: &'static str, msg: T) -> Self {
        Error::Validation {
            field,
            message: msg.to_string(),
        }
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status behind this error, if there was a response at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Auth(_) => Some(401),
            Error::Api { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for a 401 that may be cured by refreshing the token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Returns true if the user may simply try again.
    ///
    /// Transient errors are connectivity failures with no HTTP status and
    /// 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                match e.status() {
                    Some(status) => status.is_server_error(),
                    None => e.is_request(),
                }
            }
            Error::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias using the client error.
pub type Result<T> = std::result::Result<T, Error>;
