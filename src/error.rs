use thiserror::Error;

use crate::types::Scope;

/// Failure conditions returned by every backend operation.
///
/// The backend never retries anything itself; each condition is handed back
/// to the immediate caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("insufficient scope: {required:?} required, {granted:?} granted")]
    ScopeError { required: Scope, granted: Scope },

    /// The presented reference was superseded by a re-issue.
    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("invalid event ID: {0}")]
    InvalidEventId(String),
}

impl BackendError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BackendError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        BackendError::InvalidState(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BackendError::NotFound { .. } | BackendError::AccountNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
