//! HTTP implementation of the cronhook trigger contract.

mod client;

pub use client::{HttpTriggerClient, TriggerClientConfig, TriggerMethod};
