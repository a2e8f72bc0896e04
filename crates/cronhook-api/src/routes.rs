//! Route definitions.
//!
//! ```text
//! GET    /health
//! /api/v1/cron-jobs
//!   POST   /                create job
//!   GET    /                list jobs
//!   GET    /webhook         webhook records
//!   GET    /trigger-cron    sample trigger target
//!   GET    /{id}            get job
//!   PUT    /{id}            update job
//!   DELETE /{id}            delete job
//!   GET    /{id}/history    execution records
//! ```

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub const API_BASE: &str = "/api/v1/cron-jobs";

pub fn create_router(state: Arc<AppState>) -> Router {
    let jobs = Router::new()
        .route("/", get(handlers::list_jobs).post(handlers::create_job))
        .route("/webhook", get(handlers::list_webhooks))
        .route("/trigger-cron", get(handlers::trigger_cron))
        .route(
            "/{id}",
            get(handlers::get_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/{id}/history", get(handlers::job_history));

    Router::new()
        .route("/health", get(handlers::health))
        .nest(API_BASE, jobs)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
