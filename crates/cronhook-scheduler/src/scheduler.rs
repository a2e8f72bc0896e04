//! Scheduler - wires clock, registry, reconciler and executor together.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use cronhook_protocols::{JobDefinition, JobStore, ScheduleZone, StoreError, TriggerClient};

use crate::clock::{Clock, SystemClock};
use crate::error::ScheduleError;
use crate::executor::{Executor, DEFAULT_TRIGGER_TIMEOUT};
use crate::reconciler::{ReconcileOutcome, ReconcileReport, Reconciler, StartupPolicy};
use crate::registry::JobRegistry;
use crate::schedule::ScheduleClock;
use crate::timer::TimerInfo;

/// Builder for [`Scheduler`].
pub struct SchedulerBuilder {
    store: Arc<dyn JobStore>,
    trigger: Arc<dyn TriggerClient>,
    clock: Arc<dyn Clock>,
    zone: Option<ScheduleZone>,
    timeout: Duration,
    policy: StartupPolicy,
}

impl SchedulerBuilder {
    pub fn new(store: Arc<dyn JobStore>, trigger: Arc<dyn TriggerClient>) -> Self {
        Self {
            store,
            trigger,
            clock: Arc::new(SystemClock),
            zone: None,
            timeout: DEFAULT_TRIGGER_TIMEOUT,
            policy: StartupPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Zone used to evaluate cron expressions. Defaults to UTC.
    pub fn with_time_zone(mut self, zone: ScheduleZone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn with_trigger_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_startup_policy(mut self, policy: StartupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Scheduler {
        let schedule = self.zone.map(ScheduleClock::new).unwrap_or_default();
        let executor = Arc::new(
            Executor::new(
                Arc::clone(&self.store),
                self.trigger,
                Arc::clone(&self.clock),
            )
            .with_timeout(self.timeout),
        );
        let registry = Arc::new(JobRegistry::new(
            Arc::clone(&self.clock),
            schedule,
            executor,
        ));
        let reconciler = Reconciler::new(
            self.store,
            Arc::clone(&registry),
            Arc::clone(&self.clock),
            self.policy,
        );

        Scheduler {
            registry,
            reconciler,
            clock: self.clock,
        }
    }
}

/// Entry point used by the API layer and the binary.
///
/// API mutations call the `on_job_*` hooks after the store write has
/// succeeded. A hook for a job that is firing waits for the firing to
/// finish, which the trigger timeout bounds.
pub struct Scheduler {
    registry: Arc<JobRegistry>,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn builder(store: Arc<dyn JobStore>, trigger: Arc<dyn TriggerClient>) -> SchedulerBuilder {
        SchedulerBuilder::new(store, trigger)
    }

    /// Load persisted jobs and install their timers.
    pub async fn start(&self) -> Result<ReconcileReport, StoreError> {
        info!(
            zone = %self.registry.schedule_clock().zone(),
            policy = ?self.reconciler.policy(),
            "Starting scheduler"
        );
        self.reconciler.reconcile_all().await
    }

    /// A job was created. Returns the installed timer.
    pub async fn on_job_created(
        &self,
        job: &JobDefinition,
    ) -> Result<Option<TimerInfo>, ScheduleError> {
        self.on_job_changed(job).await
    }

    /// A job was updated; its timer is replaced, never patched.
    pub async fn on_job_updated(
        &self,
        job: &JobDefinition,
    ) -> Result<Option<TimerInfo>, ScheduleError> {
        self.on_job_changed(job).await
    }

    /// A job was deleted.
    pub async fn on_job_deleted(&self, job_id: &str) -> bool {
        self.reconciler.evict(job_id).await
    }

    /// Check a cron expression against the scheduler's dialect.
    pub fn validate_schedule(&self, expression: &str) -> Result<(), ScheduleError> {
        self.registry
            .schedule_clock()
            .validate(expression, self.clock.now())
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Cancel all pending timers.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    async fn on_job_changed(
        &self,
        job: &JobDefinition,
    ) -> Result<Option<TimerInfo>, ScheduleError> {
        match self.reconciler.reconcile_one(job).await {
            Ok(ReconcileOutcome::Scheduled(timer)) => Ok(Some(timer)),
            Ok(ReconcileOutcome::Removed) => Ok(None),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Job has no usable schedule");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
