//! Route handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use cronhook_protocols::ValidationError;

use crate::dto::{
    CreateJobRequest, ExecutionRecordResponse, JobResponse, UpdateJobRequest,
    WebhookRecordResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// POST /api/v1/cron-jobs
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_job = request.into_new_job()?;
    state
        .scheduler
        .validate_schedule(&new_job.schedule)
        .map_err(ValidationError::from)?;

    let job = state.repository.insert_job(new_job).await?;
    info!(job_id = %job.id, name = %job.name, schedule = %job.schedule, "Job created");

    if let Err(e) = state.scheduler.on_job_created(&job).await {
        warn!(job_id = %job.id, error = %e, "Created job could not be scheduled");
    }
    // Pick up the next run recorded by the scheduler.
    let refreshed = state.repository.get_by_id(&job.id).await;
    let job = refreshed.unwrap_or(job);

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

/// GET /api/v1/cron-jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let jobs: Vec<JobResponse> = state
        .repository
        .list_jobs()
        .await?
        .into_iter()
        .map(JobResponse::from)
        .collect();
    Ok(Json(jobs))
}

/// GET /api/v1/cron-jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job = state.repository.get_by_id(&id).await?;
    Ok(Json(JobResponse::from(job)))
}

/// PUT /api/v1/cron-jobs/{id}
///
/// The live timer is always replaced from the stored result.
pub async fn update_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let patch = request.into_patch()?;
    if let Some(schedule) = &patch.schedule {
        state
            .scheduler
            .validate_schedule(schedule)
            .map_err(ValidationError::from)?;
    }

    let job = state.repository.update_job(&id, patch).await?;
    info!(job_id = %job.id, active = job.is_active, "Job updated");

    if let Err(e) = state.scheduler.on_job_updated(&job).await {
        warn!(job_id = %job.id, error = %e, "Updated job could not be scheduled");
    }
    let refreshed = state.repository.get_by_id(&job.id).await;
    let job = refreshed.unwrap_or(job);

    Ok(Json(JobResponse::from(job)))
}

/// DELETE /api/v1/cron-jobs/{id}
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.repository.delete_job(&id).await;
    // Evict even when the store call failed.
    state.scheduler.on_job_deleted(&id).await;

    let job = deleted?;
    info!(job_id = %job.id, "Job deleted");
    Ok(Json(JobResponse::from(job)))
}

/// GET /api/v1/cron-jobs/{id}/history
pub async fn job_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let records: Vec<ExecutionRecordResponse> = state
        .repository
        .list_execution_records(&id)
        .await?
        .into_iter()
        .map(ExecutionRecordResponse::from)
        .collect();
    Ok(Json(records))
}

/// GET /api/v1/cron-jobs/webhook
pub async fn list_webhooks(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let records: Vec<WebhookRecordResponse> = state
        .repository
        .list_webhook_records()
        .await?
        .into_iter()
        .map(WebhookRecordResponse::from)
        .collect();
    Ok(Json(records))
}

/// GET /api/v1/cron-jobs/trigger-cron
///
/// A ready-made trigger target for trying the service against itself.
pub async fn trigger_cron() -> impl IntoResponse {
    Json(json!({
        "name": "trigger",
        "subject": "trigger cron event",
    }))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timers = state.scheduler.registry().snapshot();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": state.uptime().as_secs(),
        "liveTimers": timers.len(),
        "nextFire": timers.first().map(|t| t.fire_at),
    }))
}
