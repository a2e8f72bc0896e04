//! Tests for reconciliation.

use super::*;
use crate::executor::Executor;
use crate::schedule::{FireRule, ScheduleClock};
use crate::test_support::{due_job, job, start, FakeTrigger, Harness};
use cronhook_protocols::{JobPatch, JobRepository};

fn reconciler(harness: &Harness, policy: StartupPolicy) -> (Reconciler, Arc<JobRegistry>) {
    let clock: Arc<dyn Clock> = Arc::new(harness.clock.clone());
    let executor = Arc::new(Executor::new(
        harness.store.clone(),
        harness.trigger.clone(),
        Arc::clone(&clock),
    ));
    let registry = Arc::new(JobRegistry::new(
        Arc::clone(&clock),
        ScheduleClock::utc(),
        executor,
    ));
    let reconciler = Reconciler::new(harness.store.clone(), Arc::clone(&registry), clock, policy);
    (reconciler, registry)
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_all_installs_one_timer_per_eligible_job() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    harness.store.put(due_job("b")).await;
    harness
        .store
        .put(job("future", "*/5 * * * *", start() + chrono::Duration::hours(1)))
        .await;
    let mut inactive = due_job("inactive");
    inactive.is_active = false;
    harness.store.put(inactive).await;

    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    let report = reconciler.reconcile_all().await.unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.installed, 2);
    assert_eq!(registry.len(), 2);
    assert!(registry.has("a"));
    assert!(registry.has("b"));
    assert!(!registry.has("future"));
    assert!(!registry.has("inactive"));

    let stored = harness.store.get_by_id("a").await.unwrap();
    assert_eq!(stored.next_run, Some(start() + chrono::Duration::minutes(5)));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_all_twice_does_not_duplicate() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;

    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    reconciler.reconcile_all().await.unwrap();
    let generation = registry.get("a").unwrap().generation;

    let report = reconciler.reconcile_all().await.unwrap();
    assert_eq!(report.installed, 0);
    assert_eq!(report.skipped_existing, 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("a").unwrap().generation, generation);
}

#[tokio::test(start_paused = true)]
async fn test_include_future_start_policy() {
    let harness = Harness::new(FakeTrigger::ok_json());
    let start_date = start() + chrono::Duration::hours(1);
    harness
        .store
        .put(job("future", "*/5 * * * *", start_date))
        .await;

    let (reconciler, registry) = reconciler(&harness, StartupPolicy::IncludeFutureStart);
    reconciler.reconcile_all().await.unwrap();

    let timer = registry.get("future").unwrap();
    assert_eq!(timer.rule, FireRule::StartDate);
    assert_eq!(timer.fire_at, start_date);
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_leaves_registry_untouched() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    harness.store.set_unavailable(true);

    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    let result = reconciler.reconcile_all().await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bad_schedule_is_rejected_not_fatal() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("good")).await;
    harness
        .store
        .put(job("bad", "whenever", start() - chrono::Duration::hours(1)))
        .await;

    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    let report = reconciler.reconcile_all().await.unwrap();

    assert_eq!(report.installed, 1);
    assert_eq!(report.rejected, vec!["bad".to_string()]);
    assert!(registry.has("good"));
    assert!(!registry.has("bad"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_inactive_removes_timer() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    reconciler.reconcile_all().await.unwrap();

    let job = harness
        .store
        .update_job(
            "a",
            JobPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let outcome = reconciler.reconcile_one(&job).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Removed);
    assert!(!registry.has("a"));
    assert_eq!(harness.store.get_by_id("a").await.unwrap().next_run, None);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_invalid_schedule_removes_existing_timer() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    reconciler.reconcile_all().await.unwrap();

    let job = harness
        .store
        .update_job(
            "a",
            JobPatch {
                schedule: Some("nonsense".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(reconciler.reconcile_one(&job).await.is_err());
    assert!(!registry.has("a"));
}

#[tokio::test(start_paused = true)]
async fn test_evict_is_idempotent() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    reconciler.reconcile_all().await.unwrap();

    assert!(reconciler.evict("a").await);
    assert!(!reconciler.evict("a").await);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_for_deleted_job_removes_timer() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    reconciler.reconcile_all().await.unwrap();

    let deleted = harness.store.delete_job("a").await.unwrap();
    let outcome = reconciler.reconcile_one(&deleted).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Removed);
    assert!(!registry.has("a"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_for_unknown_job_installs_nothing() {
    let harness = Harness::new(FakeTrigger::ok_json());
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);

    let outcome = reconciler.reconcile_one(&due_job("ghost")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Removed);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_prefers_stored_definition() {
    let harness = Harness::new(FakeTrigger::ok_json());
    harness.store.put(due_job("a")).await;
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);

    // A stale copy from before a later edit.
    let mut stale = harness.store.get_by_id("a").await.unwrap();
    stale.schedule = "0 12 * * *".to_string();
    let outcome = reconciler.reconcile_one(&stale).await.unwrap();

    let ReconcileOutcome::Scheduled(timer) = outcome else {
        panic!("expected a timer, got {:?}", outcome);
    };
    assert_eq!(timer.fire_at, start() + chrono::Duration::minutes(5));
    assert!(registry.has("a"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_one_falls_back_to_given_definition_when_store_is_down() {
    let harness = Harness::new(FakeTrigger::ok_json());
    let (reconciler, registry) = reconciler(&harness, StartupPolicy::EligibleOnly);
    harness.store.set_unavailable(true);

    let outcome = reconciler.reconcile_one(&due_job("a")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Scheduled(_)));
    assert!(registry.has("a"));
}
