//! Live timer handles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::schedule::{FireRule, ResolvedFire};

/// One pending firing owned by the registry.
///
/// Cancelling stops the timer if it has not elapsed yet, or if it is still
/// waiting for the job lock. A firing already past both runs to completion.
#[derive(Debug)]
pub(crate) struct LiveTimer {
    pub(crate) job_id: String,
    pub(crate) fire: ResolvedFire,
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
}

impl LiveTimer {
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn info(&self) -> TimerInfo {
        TimerInfo {
            job_id: self.job_id.clone(),
            fire_at: self.fire.at,
            rule: self.fire.rule,
            generation: self.generation,
        }
    }
}

/// Read-only view of a live timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerInfo {
    pub job_id: String,
    pub fire_at: DateTime<Utc>,
    pub rule: FireRule,
    pub generation: u64,
}
