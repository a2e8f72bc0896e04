//! Scheduling core for cronhook.
//!
//! Persisted jobs become in-process timers. Each timer fires once, calls
//! the job's trigger URL, records the outcome and disarms the job.

pub mod clock;
pub mod error;
pub mod executor;
pub mod reconciler;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod timer;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ScheduleError;
pub use executor::{Executor, FiringOutcome, DEFAULT_TRIGGER_TIMEOUT};
pub use reconciler::{ReconcileOutcome, ReconcileReport, Reconciler, StartupPolicy};
pub use registry::{FireHandler, JobRegistry};
pub use schedule::{FireRule, ResolvedFire, ScheduleClock};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use timer::TimerInfo;
