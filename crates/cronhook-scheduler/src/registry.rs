//! JobRegistry - the in-process map of live timers keyed by job id.
//!
//! At most one live timer exists per job id. Installing a timer for an id
//! that already has one cancels the old timer under the same map entry
//! lock before the new one is stored, so two timers for one id are never
//! observable.
//!
//! Each id also has an async lock. A firing holds it from the moment its
//! sleep ends until the timer leaves the map, and the reconciler holds it
//! while it reads the store and installs or removes a timer. So a firing
//! and a re-arm for the same id never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cronhook_protocols::JobDefinition;

use crate::clock::Clock;
use crate::error::ScheduleError;
use crate::schedule::{ResolvedFire, ScheduleClock};
use crate::timer::{LiveTimer, TimerInfo};

/// Invoked when a timer elapses.
#[async_trait]
pub trait FireHandler: Send + Sync {
    async fn fire(&self, job: JobDefinition);
}

type LockMap = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Exclusive hold on one job id. The id's lock entry is dropped with the
/// last holder.
pub(crate) struct JobLock {
    guard: Option<OwnedMutexGuard<()>>,
    job_id: String,
    locks: LockMap,
}

impl JobLock {
    async fn acquire(locks: LockMap, job_id: &str) -> Self {
        let lock = Arc::clone(
            locks
                .entry(job_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        Self {
            guard: Some(guard),
            job_id: job_id.to_string(),
            locks,
        }
    }
}

impl Drop for JobLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.job_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Live timers keyed by job id.
pub struct JobRegistry {
    timers: Arc<DashMap<String, LiveTimer>>,
    locks: LockMap,
    clock: Arc<dyn Clock>,
    schedule: ScheduleClock,
    handler: Arc<dyn FireHandler>,
    next_generation: AtomicU64,
}

impl JobRegistry {
    pub fn new(
        clock: Arc<dyn Clock>,
        schedule: ScheduleClock,
        handler: Arc<dyn FireHandler>,
    ) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
            clock,
            schedule,
            handler,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn schedule_clock(&self) -> &ScheduleClock {
        &self.schedule
    }

    /// Wait for exclusive use of `job_id`.
    pub(crate) async fn lock(&self, job_id: &str) -> JobLock {
        JobLock::acquire(Arc::clone(&self.locks), job_id).await
    }

    /// Install or replace the timer for `job`.
    ///
    /// The schedule is resolved before the map is touched; on error any
    /// existing timer is left as it was.
    pub fn upsert(&self, job: &JobDefinition) -> Result<TimerInfo, ScheduleError> {
        let fire = self
            .schedule
            .resolve(&job.schedule, Some(job.start_date), self.clock.now())?;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let info = match self.timers.entry(job.id.clone()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.get();
                previous.cancel();
                debug!(
                    job_id = %job.id,
                    previous_generation = previous.generation,
                    generation,
                    "Replacing live timer"
                );
                let timer = self.spawn_timer(job.clone(), fire, generation);
                let info = timer.info();
                entry.insert(timer);
                info
            }
            Entry::Vacant(entry) => {
                let timer = self.spawn_timer(job.clone(), fire, generation);
                let info = timer.info();
                entry.insert(timer);
                info
            }
        };

        info!(
            job_id = %info.job_id,
            fire_at = %info.fire_at,
            rule = ?info.rule,
            "Timer installed"
        );
        Ok(info)
    }

    /// Cancel and drop the timer for `job_id`. Missing ids are a no-op.
    pub fn remove(&self, job_id: &str) -> bool {
        match self.timers.remove(job_id) {
            Some((_, timer)) => {
                timer.cancel();
                info!(job_id = %job_id, "Timer removed");
                true
            }
            None => false,
        }
    }

    pub fn has(&self, job_id: &str) -> bool {
        self.timers.contains_key(job_id)
    }

    pub fn get(&self, job_id: &str) -> Option<TimerInfo> {
        self.timers.get(job_id).map(|timer| timer.info())
    }

    /// All live timers ordered by firing instant.
    pub fn snapshot(&self) -> Vec<TimerInfo> {
        let mut timers: Vec<TimerInfo> = self.timers.iter().map(|t| t.info()).collect();
        timers.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then(a.job_id.cmp(&b.job_id)));
        timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        let count = self.timers.len();
        self.timers.retain(|_, timer| {
            timer.cancel();
            false
        });
        info!(cancelled = count, "Job registry shut down");
    }

    fn spawn_timer(&self, job: JobDefinition, fire: ResolvedFire, generation: u64) -> LiveTimer {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let timers = Arc::clone(&self.timers);
        let handler = Arc::clone(&self.handler);
        let delay = (fire.at - self.clock.now()).to_std().unwrap_or_default();
        let locks = Arc::clone(&self.locks);
        let job_id = job.id.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(job_id = %job.id, generation, "Timer cancelled before firing");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let _lock = tokio::select! {
                _ = token.cancelled() => {
                    debug!(job_id = %job.id, generation, "Timer replaced while waiting to fire");
                    return;
                }
                lock = JobLock::acquire(locks, &job.id) => lock,
            };
            if token.is_cancelled() {
                debug!(job_id = %job.id, generation, "Timer replaced while waiting to fire");
                return;
            }

            let id = job.id.clone();
            handler.fire(job).await;

            // A replacement installed while firing keeps its slot.
            timers.remove_if(&id, |_, timer| timer.generation == generation);
        });

        LiveTimer {
            job_id,
            fire,
            generation,
            cancel,
        }
    }
}

impl Drop for JobRegistry {
    fn drop(&mut self) {
        for timer in self.timers.iter() {
            timer.cancel();
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
