//! HTTP API for cronhook.
//!
//! CRUD over jobs under `/api/v1/cron-jobs`. Every mutation is written to
//! the store first and then handed to the scheduler so live timers follow
//! the persisted state.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ServerError};
pub use routes::create_router;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
