//! Error types for pupcycler

use thiserror::Error;

/// Main error type for device state operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid json received: {0}")]
    BadRequest(String),

    #[error("mismatched current state={expected:?} actual={actual:?}")]
    StateMismatch { expected: String, actual: String },

    #[error("invalid or unknown state {current:?}")]
    InvalidState { current: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::BadRequest(_) => "bad_request",
            Error::StateMismatch { .. } => "state_mismatch",
            Error::InvalidState { .. } => "invalid_state",
            Error::Storage(_) => "storage",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
        }
    }

    /// True for failures decided by the state machine rather than infrastructure
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::StateMismatch { .. } | Error::InvalidState { .. })
    }
}

impl From<crate::device::TransitionError> for Error {
    fn from(err: crate::device::TransitionError) -> Self {
        use crate::device::TransitionError;
        match err {
            TransitionError::StateMismatch { expected, actual } => {
                Error::StateMismatch { expected, actual }
            }
            TransitionError::InvalidState { current } => Error::InvalidState { current },
        }
    }
}

impl From<crate::auth::AuthError> for Error {
    fn from(err: crate::auth::AuthError) -> Self {
        match err {
            crate::auth::AuthError::Unauthorized => Error::Unauthorized,
            crate::auth::AuthError::Forbidden => Error::Forbidden,
        }
    }
}
