use super::*;
use chrono::{Duration, TimeZone};

fn sample_new_job() -> NewJob {
    NewJob {
        name: "nightly-report".to_string(),
        trigger_url: "https://x/trigger".to_string(),
        api_key: ApiKey::new("k1"),
        schedule: "*/5 * * * *".to_string(),
        start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

#[test]
fn test_api_key_is_masked_in_debug_and_display() {
    let key = ApiKey::new("super-secret-token");
    assert_eq!(key.to_string(), "****en");
    assert!(!format!("{:?}", key).contains("secret"));
    assert_eq!(key.expose(), "super-secret-token");

    let short = ApiKey::new("k1");
    assert_eq!(short.masked(), "****");
}

#[test]
fn test_api_key_serializes_transparently() {
    let key = ApiKey::new("k1");
    assert_eq!(serde_json::to_value(&key).unwrap(), serde_json::json!("k1"));
}

#[test]
fn test_new_job_validate_ok() {
    assert!(sample_new_job().validate().is_ok());
}

#[test]
fn test_new_job_rejects_empty_fields() {
    let mut job = sample_new_job();
    job.name = "  ".to_string();
    assert_eq!(
        job.validate(),
        Err(ValidationError::EmptyField { field: "name" })
    );

    let mut job = sample_new_job();
    job.api_key = ApiKey::new("");
    assert_eq!(
        job.validate(),
        Err(ValidationError::EmptyField { field: "apiKey" })
    );
}

#[test]
fn test_new_job_rejects_bad_url() {
    let mut job = sample_new_job();
    job.trigger_url = "not a url".to_string();
    assert!(matches!(job.validate(), Err(ValidationError::InvalidUrl { .. })));

    job.trigger_url = "ftp://example.com/file".to_string();
    assert!(matches!(job.validate(), Err(ValidationError::InvalidUrl { .. })));
}

#[test]
fn test_into_definition_forces_active() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    let def = sample_new_job().into_definition("job-1".to_string(), now);
    assert!(def.is_active);
    assert_eq!(def.created_at, now);
    assert_eq!(def.updated_at, now);
    assert!(def.last_run.is_none());
    assert!(def.next_run.is_none());
}

#[test]
fn test_is_eligible() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    let mut def = sample_new_job().into_definition("job-1".to_string(), now);
    assert!(def.is_eligible(now));

    def.start_date = now + Duration::minutes(10);
    assert!(!def.is_eligible(now));

    def.start_date = now;
    def.is_active = false;
    assert!(!def.is_eligible(now));
}

#[test]
fn test_patch_apply() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    let later = now + Duration::hours(1);
    let mut def = sample_new_job().into_definition("job-1".to_string(), now);
    def.is_active = false;

    let patch = JobPatch {
        schedule: Some("0 * * * *".to_string()),
        is_active: Some(true),
        ..Default::default()
    };
    patch.apply(&mut def, later);

    assert_eq!(def.schedule, "0 * * * *");
    assert!(def.is_active);
    assert_eq!(def.name, "nightly-report");
    assert_eq!(def.updated_at, later);
}

#[test]
fn test_patch_apply_always_moves_updated_at_forward() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    let mut def = sample_new_job().into_definition("job-1".to_string(), now);

    // A clock that has not moved, or moved backwards, still yields a newer stamp.
    JobPatch::default().apply(&mut def, now);
    assert_eq!(def.updated_at, now + Duration::milliseconds(1));

    JobPatch::default().apply(&mut def, now - Duration::hours(1));
    assert_eq!(def.updated_at, now + Duration::milliseconds(2));
}

#[test]
fn test_patch_validate() {
    assert!(JobPatch::default().validate().is_ok());

    let patch = JobPatch {
        trigger_url: Some("mailto:a@b".to_string()),
        ..Default::default()
    };
    assert!(patch.validate().is_err());
}

#[test]
fn test_definition_serializes_camel_case() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    let def = sample_new_job().into_definition("job-1".to_string(), now);
    let json = serde_json::to_value(&def).unwrap();
    assert_eq!(json["triggerUrl"], "https://x/trigger");
    assert_eq!(json["isActive"], true);
    assert!(json.get("startDate").is_some());
}
