//! In-memory job store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use cronhook_protocols::{
    ExecutionRecord, JobDefinition, JobPatch, JobRepository, JobStore, NewJob, StoreError,
    WebhookRecord,
};

#[derive(Default)]
struct Tables {
    jobs: HashMap<String, JobDefinition>,
    executions: Vec<ExecutionRecord>,
    webhooks: Vec<WebhookRecord>,
}

/// Job store backed by process memory.
///
/// [`MemoryJobStore::set_unavailable`] makes every call fail with
/// [`StoreError::Unavailable`], which lets callers exercise outage paths.
#[derive(Default)]
pub struct MemoryJobStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed definition, keeping its id and timestamps.
    pub async fn put(&self, job: JobDefinition) {
        let mut tables = self.tables.write().await;
        tables.jobs.insert(job.id.clone(), job);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn with_job<F>(&self, id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut JobDefinition) + Send,
    {
        self.check()?;
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(job);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_active_eligible(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobDefinition>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut jobs: Vec<JobDefinition> = tables
            .jobs
            .values()
            .filter(|job| job.is_eligible(now))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn get_by_id(&self, id: &str) -> Result<JobDefinition, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        tables
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
        self.with_job(id, |job| job.is_active = active).await
    }

    async fn disarm(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if job.updated_at != updated_at {
            return Ok(false);
        }
        job.is_active = false;
        job.next_run = None;
        Ok(true)
    }

    async fn set_next_run(
        &self,
        id: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.with_job(id, |job| job.next_run = next_run).await
    }

    async fn set_last_run(&self, id: &str, last_run: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_job(id, |job| job.last_run = Some(last_run)).await
    }

    async fn append_execution_record(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        self.check()?;
        self.tables.write().await.executions.push(record);
        Ok(())
    }

    async fn append_webhook_record(&self, record: WebhookRecord) -> Result<(), StoreError> {
        self.check()?;
        self.tables.write().await.webhooks.push(record);
        Ok(())
    }
}

#[async_trait]
impl JobRepository for MemoryJobStore {
    async fn insert_job(&self, job: NewJob) -> Result<JobDefinition, StoreError> {
        self.check()?;
        let definition = job.into_definition(Uuid::new_v4().to_string(), Utc::now());
        let mut tables = self.tables.write().await;
        tables.jobs.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    async fn list_jobs(&self) -> Result<Vec<JobDefinition>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut jobs: Vec<JobDefinition> = tables.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<JobDefinition, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(job, Utc::now());
        Ok(job.clone())
    }

    async fn delete_job(&self, id: &str) -> Result<JobDefinition, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables
            .jobs
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_execution_records(
        &self,
        job_id: &str,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .executions
            .iter()
            .rev()
            .filter(|record| record.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn list_webhook_records(&self) -> Result<Vec<WebhookRecord>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.webhooks.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
