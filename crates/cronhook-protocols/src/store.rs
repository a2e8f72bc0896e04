//! Persistence contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::job::{JobDefinition, JobPatch, NewJob};
use crate::record::{ExecutionRecord, WebhookRecord};

/// The narrow persistence interface the scheduler depends on.
///
/// Every operation on a missing job reports [`StoreError::NotFound`];
/// outages report [`StoreError::Unavailable`]. The run bookkeeping setters
/// leave `updated_at` alone; it only moves when the definition is edited.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// All jobs with `is_active = true` and `start_date <= now`.
    async fn find_active_eligible(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobDefinition>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<JobDefinition, StoreError>;

    async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError>;

    /// Set `is_active = false` and clear `next_run`, unless the job has been
    /// edited since the definition stamped `updated_at` was read.
    ///
    /// Returns `false` when a newer edit is in place and nothing changed.
    async fn disarm(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn set_next_run(
        &self,
        id: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn set_last_run(&self, id: &str, last_run: DateTime<Utc>) -> Result<(), StoreError>;

    async fn append_execution_record(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    async fn append_webhook_record(&self, record: WebhookRecord) -> Result<(), StoreError>;
}

/// CRUD operations used by the API layer.
#[async_trait]
pub trait JobRepository: JobStore {
    /// Persist a new job; the store assigns the id and timestamps.
    async fn insert_job(&self, job: NewJob) -> Result<JobDefinition, StoreError>;

    async fn list_jobs(&self) -> Result<Vec<JobDefinition>, StoreError>;

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<JobDefinition, StoreError>;

    /// Delete a job, returning the removed definition. History is kept.
    async fn delete_job(&self, id: &str) -> Result<JobDefinition, StoreError>;

    /// Execution records for one job, newest first.
    async fn list_execution_records(&self, job_id: &str)
        -> Result<Vec<ExecutionRecord>, StoreError>;

    /// All webhook records, newest first.
    async fn list_webhook_records(&self) -> Result<Vec<WebhookRecord>, StoreError>;
}
