//! Error types for Stride Core

use thiserror::Error;

/// Failure reported by a profile store operation.
///
/// The reason is free text intended for logging only; callers must never
/// parse it to make decisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct StoreError {
    pub reason: String,
}

impl StoreError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can surface from engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store read failed: {0}")]
    ReadFailed(StoreError),

    #[error("store write failed: {0}")]
    WriteFailed(StoreError),

    #[error("no profile exists for user {0}")]
    ProfileMissing(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
