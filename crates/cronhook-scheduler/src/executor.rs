//! Executor - performs one firing and disarms the job.
//!
//! Every firing ends with the job set inactive, whether the trigger call
//! succeeded or failed. A job fires at most once per activation; the cron
//! expression only decides *when* that single firing happens. Re-arming
//! takes an explicit update that sets `isActive` back to true.
//!
//! Before calling out, the job is re-read: a job that was deleted,
//! deactivated or edited since its timer was armed is skipped. The disarm
//! is conditional on the armed revision, so an edit that lands while the
//! trigger call is in flight stays armed.
//!
//! ```text
//! Pending -> Triggering -> Succeeded | Failed -> Finalized
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use cronhook_protocols::{
    ExecutionRecord, JobDefinition, JobStore, StoreError, TriggerClient, TriggerError,
    TriggerResponse, WebhookRecord,
};

use crate::clock::Clock;
use crate::registry::FireHandler;

/// Default bound on one trigger call.
pub const DEFAULT_TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// How a firing ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FiringOutcome {
    Succeeded { status_code: u16 },
    Failed { message: String },
}

impl FiringOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FiringOutcome::Succeeded { .. })
    }
}

pub struct Executor {
    store: Arc<dyn JobStore>,
    trigger: Arc<dyn TriggerClient>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl Executor {
    pub fn new(
        store: Arc<dyn JobStore>,
        trigger: Arc<dyn TriggerClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            trigger,
            clock,
            timeout: DEFAULT_TRIGGER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one firing for `job`. Never returns an error: trigger and store
    /// failures end up as history records and log lines.
    pub async fn execute(&self, job: &JobDefinition) -> FiringOutcome {
        let triggered_at = self.clock.now();
        info!(job_id = %job.id, name = %job.name, url = %job.trigger_url, "Firing job");

        let outcome = match self.call_trigger(job).await {
            Ok(response) => self.on_response(job, response, triggered_at).await,
            Err(e) => self.on_failure(job, e.to_string(), triggered_at).await,
        };

        self.finalize(job, triggered_at).await;
        outcome
    }

    async fn call_trigger(&self, job: &JobDefinition) -> Result<TriggerResponse, TriggerError> {
        match tokio::time::timeout(
            self.timeout,
            self.trigger.invoke(&job.trigger_url, &job.api_key),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TriggerError::Timeout(self.timeout)),
        }
    }

    async fn on_response(
        &self,
        job: &JobDefinition,
        response: TriggerResponse,
        triggered_at: DateTime<Utc>,
    ) -> FiringOutcome {
        if !response.ok() {
            let message = format!("HTTP {}: {}", response.status_code, response.body_text);
            return self.on_failure(job, message, triggered_at).await;
        }

        let Some(payload) = response.parsed_payload else {
            let message = format!(
                "HTTP {}: response body is not JSON: {}",
                response.status_code, response.body_text
            );
            return self.on_failure(job, message, triggered_at).await;
        };

        let record = ExecutionRecord::success(&job.id, payload.to_string(), triggered_at);
        self.record("execution record", &job.id, self.store.append_execution_record(record).await);

        let webhook = WebhookRecord::new(&job.id, payload, triggered_at);
        self.record("webhook record", &job.id, self.store.append_webhook_record(webhook).await);

        info!(job_id = %job.id, status = response.status_code, "Trigger succeeded");
        FiringOutcome::Succeeded {
            status_code: response.status_code,
        }
    }

    async fn on_failure(
        &self,
        job: &JobDefinition,
        message: String,
        triggered_at: DateTime<Utc>,
    ) -> FiringOutcome {
        warn!(job_id = %job.id, error = %message, "Trigger failed");
        let record = ExecutionRecord::failed(&job.id, message.clone(), triggered_at);
        self.record("execution record", &job.id, self.store.append_execution_record(record).await);
        FiringOutcome::Failed { message }
    }

    /// Disarm and record the run. The last run is recorded even when the
    /// disarm failed or yielded to a newer edit.
    async fn finalize(&self, job: &JobDefinition, fired_at: DateTime<Utc>) {
        match self.store.disarm(&job.id, job.updated_at).await {
            Ok(true) => {}
            Ok(false) => {
                info!(job_id = %job.id, "Job edited while firing, newer definition stays armed");
            }
            Err(e) if e.is_not_found() => {
                info!(job_id = %job.id, "Job deleted while firing");
                return;
            }
            Err(e) => error!(job_id = %job.id, error = %e, "Failed to disarm job"),
        }

        match self.store.set_last_run(&job.id, fired_at).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => info!(job_id = %job.id, "Job deleted while firing"),
            Err(e) => error!(job_id = %job.id, error = %e, "Failed to record last run"),
        }
    }

    fn record(&self, what: &str, job_id: &str, result: Result<(), StoreError>) {
        if let Err(e) = result {
            error!(job_id = %job_id, error = %e, "Failed to write {}", what);
        }
    }
}

#[async_trait]
impl FireHandler for Executor {
    async fn fire(&self, job: JobDefinition) {
        match self.store.get_by_id(&job.id).await {
            Ok(stored) if !stored.is_active => {
                info!(job_id = %job.id, "Job deactivated before firing, skipping");
            }
            Ok(stored) if stored.updated_at != job.updated_at => {
                info!(job_id = %job.id, "Job edited since its timer was armed, skipping");
            }
            Ok(stored) => {
                self.execute(&stored).await;
            }
            Err(e) if e.is_not_found() => {
                info!(job_id = %job.id, "Job deleted before firing, skipping");
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Could not re-read job, firing as armed");
                self.execute(&job).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
