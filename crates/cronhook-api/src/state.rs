//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use cronhook_protocols::JobRepository;
use cronhook_scheduler::Scheduler;

pub struct AppState {
    pub repository: Arc<dyn JobRepository>,
    pub scheduler: Arc<Scheduler>,
    start_time: Instant,
}

impl AppState {
    pub fn new(repository: Arc<dyn JobRepository>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            repository,
            scheduler,
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
