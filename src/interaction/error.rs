//! Handler execution errors

use thiserror::Error;

use crate::module::traits::ModuleError;
use crate::storage::StorageError;

/// Error returned by a capability handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Rejection meant for the user (bad input, missing permission)
    #[error("{0}")]
    User(String),

    /// Something broke while handling the interaction
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn user(message: impl Into<String>) -> Self {
        ExecutionError::User(message.into())
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(self, ExecutionError::User(_))
    }

    /// Text shown to the user
    pub fn user_message(&self) -> &str {
        match self {
            ExecutionError::User(message) => message,
            ExecutionError::Internal(_) => "Something went wrong while handling this interaction.",
        }
    }
}

impl From<ModuleError> for ExecutionError {
    fn from(e: ModuleError) -> Self {
        ExecutionError::Internal(e.to_string())
    }
}

impl From<StorageError> for ExecutionError {
    fn from(e: StorageError) -> Self {
        ExecutionError::Internal(e.to_string())
    }
}
