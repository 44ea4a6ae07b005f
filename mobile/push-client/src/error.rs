use thiserror::Error;

use crate::capability::UnsupportedReason;

/// Push client error types
///
/// Collaborators (OS runtime, storage, token registry) report failures with
/// these variants. `PushClient` never lets them escape: every public
/// operation logs the error and degrades to `None`, `false` or an outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Push capability unavailable: {0}")]
    CapabilityUnavailable(UnsupportedReason),

    #[error("Failed to acquire push token: {0}")]
    AcquisitionFailure(String),

    #[error("Push token storage failed: {0}")]
    PersistenceFailure(String),

    #[error("Malformed notification payload: {0}")]
    MalformedPayload(String),

    #[error("Notification runtime error: {0}")]
    Runtime(String),

    #[error("Token registry request failed: {0}")]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<PushError> for String {
    fn from(err: PushError) -> Self {
        err.to_string()
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Backend(err.to_string())
    }
}

impl From<std::io::Error> for PushError {
    fn from(err: std::io::Error) -> Self {
        PushError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        PushError::PersistenceFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PushError>;
