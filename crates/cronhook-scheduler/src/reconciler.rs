//! Reconciler - makes the registry match what the store says is active.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use cronhook_protocols::{JobDefinition, JobStore, StoreError};

use crate::clock::Clock;
use crate::error::ScheduleError;
use crate::registry::JobRegistry;
use crate::timer::TimerInfo;

/// Which persisted jobs get a timer at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Only jobs whose start date has already passed.
    #[default]
    EligibleOnly,
    /// Also jobs whose start date is still in the future.
    IncludeFutureStart,
}

/// Outcome of a startup reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub loaded: usize,
    pub installed: usize,
    pub skipped_existing: usize,
    pub rejected: Vec<String>,
}

/// What reconciling a single job did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Scheduled(TimerInfo),
    Removed,
}

pub struct Reconciler {
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    clock: Arc<dyn Clock>,
    policy: StartupPolicy,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<JobRegistry>,
        clock: Arc<dyn Clock>,
        policy: StartupPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> StartupPolicy {
        self.policy
    }

    /// Install a timer for every active, eligible job.
    ///
    /// Jobs that already have a live timer are left alone. A store failure
    /// aborts the pass without touching the registry. A job whose schedule
    /// cannot be resolved is reported and skipped.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, StoreError> {
        let cutoff = match self.policy {
            StartupPolicy::EligibleOnly => self.clock.now(),
            StartupPolicy::IncludeFutureStart => DateTime::<Utc>::MAX_UTC,
        };

        let jobs = match self.store.find_active_eligible(cutoff).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "Failed to load active jobs, registry left unchanged");
                return Err(e);
            }
        };

        let mut report = ReconcileReport {
            loaded: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            let _lock = self.registry.lock(&job.id).await;
            if self.registry.has(&job.id) {
                report.skipped_existing += 1;
                continue;
            }
            match self.registry.upsert(&job) {
                Ok(timer) => {
                    self.record_next_run(&job.id, Some(timer.fire_at)).await;
                    report.installed += 1;
                }
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Skipping job with unusable schedule");
                    report.rejected.push(job.id);
                }
            }
        }

        info!(
            loaded = report.loaded,
            installed = report.installed,
            skipped = report.skipped_existing,
            rejected = report.rejected.len(),
            "Startup reconciliation complete"
        );
        Ok(report)
    }

    /// Bring one job's timer in line with its stored definition.
    ///
    /// The job is re-read under its lock, so a hook that arrives after a
    /// delete, or after a newer edit, acts on what the store holds now.
    /// `job` is only used when the store cannot be reached. Active jobs get
    /// their timer replaced, inactive or deleted ones lose it. When the
    /// schedule is unusable the existing timer is removed too, so a job
    /// never keeps firing on a schedule it no longer has.
    pub async fn reconcile_one(
        &self,
        job: &JobDefinition,
    ) -> Result<ReconcileOutcome, ScheduleError> {
        let _lock = self.registry.lock(&job.id).await;

        let current = match self.store.get_by_id(&job.id).await {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => {
                info!(job_id = %job.id, "Job no longer exists, dropping its timer");
                self.registry.remove(&job.id);
                return Ok(ReconcileOutcome::Removed);
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Could not re-read job, using hook definition");
                job.clone()
            }
        };

        if !current.is_active {
            self.registry.remove(&current.id);
            self.record_next_run(&current.id, None).await;
            return Ok(ReconcileOutcome::Removed);
        }

        match self.registry.upsert(&current) {
            Ok(timer) => {
                self.record_next_run(&current.id, Some(timer.fire_at)).await;
                Ok(ReconcileOutcome::Scheduled(timer))
            }
            Err(e) => {
                if self.registry.remove(&current.id) {
                    self.record_next_run(&current.id, None).await;
                }
                Err(e)
            }
        }
    }

    /// Remove the timer for a deleted job, waiting out a firing in flight.
    pub async fn evict(&self, job_id: &str) -> bool {
        let _lock = self.registry.lock(job_id).await;
        self.registry.remove(job_id)
    }

    async fn record_next_run(&self, job_id: &str, next_run: Option<DateTime<Utc>>) {
        if let Err(e) = self.store.set_next_run(job_id, next_run).await {
            if e.is_not_found() {
                info!(job_id = %job_id, "Job vanished before next run could be recorded");
            } else {
                warn!(job_id = %job_id, error = %e, "Failed to record next run");
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
