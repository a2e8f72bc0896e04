//! Execution history and webhook payload records. Both are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(ExecutionStatus::Success),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }
}

/// One firing attempt. References its job weakly: history outlives the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub job_id: String,
    pub status: ExecutionStatus,
    /// Response body on success, error message or response text on failure.
    pub response: String,
    pub triggered_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn success(
        job_id: impl Into<String>,
        response: impl Into<String>,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self::new(job_id, ExecutionStatus::Success, response, triggered_at)
    }

    pub fn failed(
        job_id: impl Into<String>,
        response: impl Into<String>,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self::new(job_id, ExecutionStatus::Failed, response, triggered_at)
    }

    fn new(
        job_id: impl Into<String>,
        status: ExecutionStatus,
        response: impl Into<String>,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            status,
            response: response.into(),
            triggered_at,
        }
    }
}

/// Structured payload captured from a successful trigger response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecord {
    pub id: String,
    pub job_id: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookRecord {
    pub fn new(job_id: impl Into<String>, data: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            data,
            created_at: at,
            updated_at: at,
        }
    }
}
