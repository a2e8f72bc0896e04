//! Fakes shared by the scheduler test modules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use cronhook_protocols::{
    ApiKey, JobDefinition, NewJob, TriggerClient, TriggerError, TriggerResponse,
};
use cronhook_store::MemoryJobStore;

use crate::clock::ManualClock;

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap()
}

pub(crate) fn new_job(schedule: &str, start_date: DateTime<Utc>) -> NewJob {
    NewJob {
        name: "hook".to_string(),
        trigger_url: "http://localhost/hooks".to_string(),
        api_key: ApiKey::new("secret-key-42"),
        schedule: schedule.to_string(),
        start_date,
    }
}

pub(crate) fn job(id: &str, schedule: &str, start_date: DateTime<Utc>) -> JobDefinition {
    NewJob {
        name: format!("job {}", id),
        trigger_url: format!("http://localhost/hooks/{}", id),
        ..new_job(schedule, start_date)
    }
    .into_definition(id.to_string(), start())
}

/// A job whose cron fires five minutes after [`start`].
pub(crate) fn due_job(id: &str) -> JobDefinition {
    job(id, "*/5 * * * *", start() - chrono::Duration::hours(1))
}

#[derive(Clone)]
pub(crate) enum Reply {
    Respond(u16, &'static str),
    Fail(&'static str),
    Hang,
}

/// Trigger client that replays one canned reply and records every call.
pub(crate) struct FakeTrigger {
    reply: Mutex<Reply>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts one call as in flight until dropped, timeouts included.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTrigger {
    pub(crate) fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub(crate) fn ok_json() -> Arc<Self> {
        Self::new(Reply::Respond(200, r#"{"ok":true}"#))
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Most calls ever in flight at once.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TriggerClient for FakeTrigger {
    async fn invoke(&self, url: &str, api_key: &ApiKey) -> Result<TriggerResponse, TriggerError> {
        self.calls
            .lock()
            .push((url.to_string(), api_key.expose().to_string()));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let reply = self.reply.lock().clone();
        match reply {
            Reply::Respond(status, body) => Ok(TriggerResponse::from_body(status, body)),
            Reply::Fail(message) => Err(TriggerError::Transport(message.to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(TriggerError::Transport("unreachable".to_string()))
            }
        }
    }
}

pub(crate) struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub trigger: Arc<FakeTrigger>,
    pub clock: ManualClock,
}

impl Harness {
    pub(crate) fn new(trigger: Arc<FakeTrigger>) -> Self {
        Self {
            store: Arc::new(MemoryJobStore::new()),
            trigger,
            clock: ManualClock::new(start()),
        }
    }
}

/// Let spawned timer tasks run to their next await point.
pub(crate) async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
