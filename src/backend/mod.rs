//! Outbound calls to the SaaS backends.
//!
//! Every connector talks to its backend through [`BackendHttp`], which
//! normalizes failures into [`BackendError`]. Nothing here retries.

pub mod credentials;
pub mod http;

use thiserror::Error;

pub use credentials::CredentialCache;
pub use http::{unauthorized_on_401, BackendHttp, UnauthorizedRule};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The backend refused the forwarded credentials. `status` is what the
    /// backend actually returned (not always 401).
    #[error("backend rejected credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No usable status: transport failure or a body we could not decode.
    #[error("backend error: {message}")]
    Unknown { message: String },
}

impl BackendError {
    /// Value reported to the hub in `X-Backend-Status`.
    pub fn status_label(&self) -> String {
        match self {
            BackendError::Unauthorized { .. } => "401".to_string(),
            BackendError::Status { status, .. } => status.to_string(),
            BackendError::Unknown { .. } => "unknown".to_string(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BackendError::Unauthorized { message, .. }
            | BackendError::Status { message, .. }
            | BackendError::Unknown { message } => message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized { .. })
    }
}
