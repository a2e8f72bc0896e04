//! Scheduler error types.

use thiserror::Error;

use cronhook_protocols::ValidationError;

/// A schedule that cannot be turned into a firing instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Wrong number of whitespace-separated fields.
    #[error("cron expression '{expression}' has {count} fields, expected 5, 6 or 7")]
    FieldCount { expression: String, count: usize },

    /// The cron parser rejected the expression.
    #[error("cron expression '{expression}' is invalid: {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// The expression parses but never matches again.
    #[error("cron expression '{0}' has no upcoming occurrence")]
    NoUpcoming(String),
}

impl ScheduleError {
    pub fn expression(&self) -> &str {
        match self {
            ScheduleError::FieldCount { expression, .. } => expression,
            ScheduleError::InvalidExpression { expression, .. } => expression,
            ScheduleError::NoUpcoming(expression) => expression,
        }
    }
}

impl From<ScheduleError> for ValidationError {
    fn from(err: ScheduleError) -> Self {
        ValidationError::InvalidSchedule {
            expression: err.expression().to_string(),
            message: err.to_string(),
        }
    }
}
