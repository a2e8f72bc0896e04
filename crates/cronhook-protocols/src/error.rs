//! Error types shared across the cronhook crates.

use std::time::Duration;

use thiserror::Error;

/// Rejected job input, surfaced synchronously to the API caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("Invalid value for {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Invalid trigger URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid schedule '{expression}': {message}")]
    InvalidSchedule { expression: String, message: String },
}

/// Persistence failures.
///
/// `NotFound` and `Unavailable` are always distinguishable so callers can
/// decide whether a missing job is an expected race or an outage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Outbound trigger failures. Recorded as failed executions, never propagated
/// past the executor.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Invalid trigger URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid credential header: {0}")]
    InvalidHeader(String),

    #[error("Trigger request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Trigger request failed: {0}")]
    Transport(String),
}
