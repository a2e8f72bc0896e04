//! # cronhook Protocols
//!
//! Core protocol definitions for the cronhook scheduler.
//! Contains only the data model and interface definitions - no I/O.
//!
//! ## Core Traits
//!
//! - [`JobStore`] - Narrow persistence interface consumed by the scheduler
//! - [`JobRepository`] - CRUD persistence interface consumed by the API layer
//! - [`TriggerClient`] - Outbound HTTP trigger capability

pub mod error;
pub mod job;
pub mod record;
pub mod store;
pub mod trigger;
pub mod zone;

pub use error::{StoreError, TriggerError, ValidationError};
pub use job::{ApiKey, JobDefinition, JobPatch, NewJob};
pub use record::{ExecutionRecord, ExecutionStatus, WebhookRecord};
pub use store::{JobRepository, JobStore};
pub use trigger::{TriggerClient, TriggerResponse};
pub use zone::ScheduleZone;
