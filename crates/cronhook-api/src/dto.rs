//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cronhook_protocols::{
    ApiKey, ExecutionRecord, JobDefinition, JobPatch, NewJob, ValidationError, WebhookRecord,
};

/// `POST /api/v1/cron-jobs` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub name: Option<String>,
    pub trigger_url: Option<String>,
    pub api_key: Option<String>,
    pub schedule: Option<String>,
    pub start_date: Option<String>,
}

impl CreateJobRequest {
    /// Check presence of every field and convert. Cron syntax is checked
    /// separately by the scheduler.
    pub fn into_new_job(self) -> Result<NewJob, ValidationError> {
        let job = NewJob {
            name: self.name.ok_or(ValidationError::MissingField("name"))?,
            trigger_url: self
                .trigger_url
                .ok_or(ValidationError::MissingField("triggerUrl"))?,
            api_key: ApiKey::new(self.api_key.ok_or(ValidationError::MissingField("apiKey"))?),
            schedule: self.schedule.ok_or(ValidationError::MissingField("schedule"))?,
            start_date: parse_start_date(
                &self
                    .start_date
                    .ok_or(ValidationError::MissingField("startDate"))?,
            )?,
        };
        job.validate()?;
        Ok(job)
    }
}

/// `PUT /api/v1/cron-jobs/{id}` body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub name: Option<String>,
    pub trigger_url: Option<String>,
    pub api_key: Option<String>,
    pub schedule: Option<String>,
    pub start_date: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateJobRequest {
    pub fn into_patch(self) -> Result<JobPatch, ValidationError> {
        let patch = JobPatch {
            name: self.name,
            trigger_url: self.trigger_url,
            api_key: self.api_key.map(ApiKey::new),
            schedule: self.schedule,
            start_date: self.start_date.as_deref().map(parse_start_date).transpose()?,
            is_active: self.is_active,
        };
        patch.validate()?;
        Ok(patch)
    }
}

fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidField {
            field: "startDate",
            message: format!("expected an RFC 3339 timestamp: {}", e),
        })
}

/// A job as returned to clients, with the API key masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub name: String,
    pub trigger_url: String,
    pub api_key: String,
    pub schedule: String,
    pub start_date: DateTime<Utc>,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobDefinition> for JobResponse {
    fn from(job: JobDefinition) -> Self {
        Self {
            api_key: job.api_key.masked(),
            id: job.id,
            name: job.name,
            trigger_url: job.trigger_url,
            schedule: job.schedule,
            start_date: job.start_date,
            is_active: job.is_active,
            last_run: job.last_run,
            next_run: job.next_run,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecordResponse {
    pub id: String,
    pub job_id: String,
    pub status: String,
    pub response: String,
    pub triggered_at: DateTime<Utc>,
}

impl From<ExecutionRecord> for ExecutionRecordResponse {
    fn from(record: ExecutionRecord) -> Self {
        Self {
            id: record.id,
            job_id: record.job_id,
            status: record.status.as_str().to_string(),
            response: record.response,
            triggered_at: record.triggered_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecordResponse {
    pub id: String,
    pub job_id: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookRecord> for WebhookRecordResponse {
    fn from(record: WebhookRecord) -> Self {
        Self {
            id: record.id,
            job_id: record.job_id,
            data: record.data,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> CreateJobRequest {
        CreateJobRequest {
            name: Some("nightly".to_string()),
            trigger_url: Some("https://example.com/hook".to_string()),
            api_key: Some("secret-key-42".to_string()),
            schedule: Some("0 2 * * *".to_string()),
            start_date: Some("2026-03-10T10:00:00+05:30".to_string()),
        }
    }

    #[test]
    fn test_create_request_converts() {
        let job = full_request().into_new_job().unwrap();
        assert_eq!(job.name, "nightly");
        assert_eq!(job.start_date.to_rfc3339(), "2026-03-10T04:30:00+00:00");
    }

    #[test]
    fn test_create_request_missing_field() {
        let request = CreateJobRequest {
            api_key: None,
            ..full_request()
        };
        assert_eq!(
            request.into_new_job().unwrap_err(),
            ValidationError::MissingField("apiKey")
        );
    }

    #[test]
    fn test_create_request_bad_start_date() {
        let request = CreateJobRequest {
            start_date: Some("tomorrow".to_string()),
            ..full_request()
        };
        assert!(matches!(
            request.into_new_job(),
            Err(ValidationError::InvalidField { field: "startDate", .. })
        ));
    }

    #[test]
    fn test_update_request_partial() {
        let request: UpdateJobRequest =
            serde_json::from_value(serde_json::json!({"isActive": true})).unwrap();
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.is_active, Some(true));
        assert!(patch.schedule.is_none());
    }

    #[test]
    fn test_job_response_masks_key() {
        let job = full_request()
            .into_new_job()
            .unwrap()
            .into_definition("j1".to_string(), Utc::now());
        let response = JobResponse::from(job);
        assert_eq!(response.api_key, "****42");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["apiKey"], "****42");
        assert_eq!(json["triggerUrl"], "https://example.com/hook");
        assert_eq!(json["isActive"], true);
    }
}
