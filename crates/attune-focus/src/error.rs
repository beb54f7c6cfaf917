//! Error types for focus session operations.

use crate::store::StoreError;

/// Broad classification of a [`FocusError`], for user-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Conflict,
    Internal,
}

/// Error type for focus session operations.
#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    /// No session exists for the identity.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The requested transition is not allowed in the current state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The request itself is malformed (e.g., duration out of range).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A live session already exists for the identity.
    #[error("Session already active: {0}")]
    Conflict(String),

    /// A broken invariant. Logged where it is detected.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the history store.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl FocusError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FocusError::NotFound(_) | FocusError::Storage(StoreError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            FocusError::InvalidState(_) => ErrorKind::InvalidState,
            FocusError::Validation(_) => ErrorKind::Validation,
            FocusError::Conflict(_) => ErrorKind::Conflict,
            FocusError::Internal(_) | FocusError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller can act on the error (as opposed to a defect or
    /// infrastructure failure).
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }
}

/// Result type for focus session operations.
pub type Result<T> = std::result::Result<T, FocusError>;
