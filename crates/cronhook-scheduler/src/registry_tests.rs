//! Tests for the job registry.

use super::*;
use crate::clock::ManualClock;
use crate::schedule::FireRule;
use crate::test_support::settle;
use chrono::{DateTime, TimeZone, Utc};
use cronhook_protocols::{ApiKey, NewJob};
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingHandler {
    fired: Mutex<Vec<(String, String)>>,
}

impl RecordingHandler {
    fn fired(&self) -> Vec<(String, String)> {
        self.fired.lock().clone()
    }
}

#[async_trait]
impl FireHandler for RecordingHandler {
    async fn fire(&self, job: JobDefinition) {
        self.fired.lock().push((job.id, job.schedule));
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap()
}

fn job(id: &str, schedule: &str, start_date: DateTime<Utc>) -> JobDefinition {
    NewJob {
        name: format!("job {}", id),
        trigger_url: "http://localhost/hook".to_string(),
        api_key: ApiKey::new("secret-key"),
        schedule: schedule.to_string(),
        start_date,
    }
    .into_definition(id.to_string(), start())
}

fn registry() -> (JobRegistry, Arc<RecordingHandler>, ManualClock) {
    let clock = ManualClock::new(start());
    let handler = Arc::new(RecordingHandler::default());
    let registry = JobRegistry::new(
        Arc::new(clock.clone()),
        ScheduleClock::utc(),
        handler.clone(),
    );
    (registry, handler, clock)
}

#[tokio::test(start_paused = true)]
async fn test_upsert_installs_timer() {
    let (registry, _, _) = registry();
    let info = registry
        .upsert(&job("a", "*/5 * * * *", start() - chrono::Duration::hours(1)))
        .unwrap();

    assert_eq!(info.job_id, "a");
    assert_eq!(info.rule, FireRule::Cron);
    assert_eq!(info.fire_at, start() + chrono::Duration::minutes(5));
    assert!(registry.has("a"));
    assert_eq!(registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_upsert_keeps_one_timer_with_latest_schedule() {
    let (registry, handler, _) = registry();
    let past = start() - chrono::Duration::hours(1);

    let first = registry.upsert(&job("a", "*/5 * * * *", past)).unwrap();
    let second = registry.upsert(&job("a", "*/2 * * * *", past)).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(second.generation > first.generation);
    assert_eq!(registry.get("a").unwrap().generation, second.generation);

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;

    let fired = handler.fired();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].1, "*/2 * * * *");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_schedule_leaves_existing_timer() {
    let (registry, _, _) = registry();
    let past = start() - chrono::Duration::hours(1);
    let installed = registry.upsert(&job("a", "*/5 * * * *", past)).unwrap();

    let result = registry.upsert(&job("a", "not a cron", past));
    assert!(result.is_err());
    assert_eq!(registry.get("a").unwrap().generation, installed.generation);
}

#[tokio::test(start_paused = true)]
async fn test_remove_cancels_pending_timer() {
    let (registry, handler, _) = registry();
    registry
        .upsert(&job("a", "*/5 * * * *", start() - chrono::Duration::hours(1)))
        .unwrap();

    assert!(registry.remove("a"));
    assert!(!registry.has("a"));

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert!(handler.fired().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remove_missing_is_noop() {
    let (registry, _, _) = registry();
    assert!(!registry.remove("missing"));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_once_and_leaves_registry() {
    let (registry, handler, _) = registry();
    registry
        .upsert(&job("a", "*/5 * * * *", start() - chrono::Duration::hours(1)))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(4 * 60)).await;
    assert!(handler.fired().is_empty());

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(handler.fired().len(), 1);
    assert!(!registry.has("a"));

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert_eq!(handler.fired().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_future_start_date_fires_at_start() {
    let (registry, handler, _) = registry();
    let start_date = start() + chrono::Duration::minutes(7);
    let info = registry.upsert(&job("a", "*/5 * * * *", start_date)).unwrap();
    assert_eq!(info.rule, FireRule::StartDate);

    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    assert!(handler.fired().is_empty());

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(handler.fired().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_is_sorted_by_fire_time() {
    let (registry, _, _) = registry();
    registry
        .upsert(&job("late", "0 12 * * *", start() - chrono::Duration::hours(1)))
        .unwrap();
    registry
        .upsert(&job("soon", "*/5 * * * *", start() - chrono::Duration::hours(1)))
        .unwrap();

    let ids: Vec<String> = registry.snapshot().into_iter().map(|t| t.job_id).collect();
    assert_eq!(ids, vec!["soon".to_string(), "late".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_everything() {
    let (registry, handler, _) = registry();
    let past = start() - chrono::Duration::hours(1);
    registry.upsert(&job("a", "*/5 * * * *", past)).unwrap();
    registry.upsert(&job("b", "*/10 * * * *", past)).unwrap();

    registry.shutdown();
    assert!(registry.is_empty());

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert!(handler.fired().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_firing_waits_for_job_lock() {
    let (registry, handler, _) = registry();
    let held = registry.lock("a").await;
    registry
        .upsert(&job("a", "*/5 * * * *", start() - chrono::Duration::hours(1)))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    assert!(handler.fired().is_empty());

    drop(held);
    settle().await;
    assert_eq!(handler.fired().len(), 1);
    assert!(!registry.has("a"));
}

#[tokio::test(start_paused = true)]
async fn test_timer_replaced_while_waiting_for_lock_never_fires() {
    let (registry, handler, _) = registry();
    let past = start() - chrono::Duration::hours(1);
    let held = registry.lock("a").await;
    registry.upsert(&job("a", "*/5 * * * *", past)).unwrap();

    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    let replacement = registry.upsert(&job("a", "0 12 * * *", past)).unwrap();
    drop(held);
    settle().await;

    assert!(handler.fired().is_empty());
    assert_eq!(registry.get("a").unwrap().generation, replacement.generation);
}

#[tokio::test(start_paused = true)]
async fn test_lock_entry_dropped_with_last_holder() {
    let (registry, _, _) = registry();
    {
        let _lock = registry.lock("a").await;
        assert_eq!(registry.locks.len(), 1);
    }
    assert!(registry.locks.is_empty());
}
