//! Job definitions.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Credential sent to the trigger endpoint.
///
/// `Debug` and `Display` only ever render a masked form; use
/// [`ApiKey::expose`] at the single point where the header is built.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The cleartext key.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked rendering: keys longer than 6 characters keep their last 2.
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count > 6 {
            let tail: String = self.0.chars().skip(count - 2).collect();
            format!("****{}", tail)
        } else {
            "****".to_string()
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// A persisted scheduled HTTP trigger.
///
/// A job with `is_active == false` never has a live timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    pub id: String,
    pub name: String,
    pub trigger_url: String,
    pub api_key: ApiKey,
    /// Cron expression (5-field standard or 6/7-field with seconds).
    pub schedule: String,
    /// Earliest start. A future start date is the first firing instant.
    pub start_date: DateTime<Utc>,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobDefinition {
    /// Whether the startup reconciliation would load this job at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now
    }
}

/// Input for creating a job. `is_active` is always forced true on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub name: String,
    pub trigger_url: String,
    pub api_key: ApiKey,
    pub schedule: String,
    pub start_date: DateTime<Utc>,
}

impl NewJob {
    /// Check required fields and the trigger URL.
    ///
    /// Cron syntax is validated by the scheduler, which owns the dialect.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("triggerUrl", &self.trigger_url)?;
        if self.api_key.is_empty() {
            return Err(ValidationError::EmptyField { field: "apiKey" });
        }
        require_non_empty("schedule", &self.schedule)?;
        validate_trigger_url(&self.trigger_url)
    }

    /// Materialize the definition a store persists.
    pub fn into_definition(self, id: String, now: DateTime<Utc>) -> JobDefinition {
        JobDefinition {
            id,
            name: self.name,
            trigger_url: self.trigger_url,
            api_key: self.api_key,
            schedule: self.schedule,
            start_date: self.start_date,
            is_active: true,
            last_run: None,
            next_run: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Any field may change, including `is_active`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub name: Option<String>,
    pub trigger_url: Option<String>,
    pub api_key: Option<ApiKey>,
    pub schedule: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl JobPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(url) = &self.trigger_url {
            require_non_empty("triggerUrl", url)?;
            validate_trigger_url(url)?;
        }
        if let Some(key) = &self.api_key {
            if key.is_empty() {
                return Err(ValidationError::EmptyField { field: "apiKey" });
            }
        }
        if let Some(schedule) = &self.schedule {
            require_non_empty("schedule", schedule)?;
        }
        Ok(())
    }

    /// Apply the patch in place and bump `updated_at`.
    ///
    /// The new stamp is at least one millisecond past the old one, so every
    /// edit is distinguishable even on a millisecond-precision store.
    pub fn apply(self, job: &mut JobDefinition, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            job.name = name;
        }
        if let Some(url) = self.trigger_url {
            job.trigger_url = url;
        }
        if let Some(key) = self.api_key {
            job.api_key = key;
        }
        if let Some(schedule) = self.schedule {
            job.schedule = schedule;
        }
        if let Some(start_date) = self.start_date {
            job.start_date = start_date;
        }
        if let Some(active) = self.is_active {
            job.is_active = active;
        }
        job.updated_at = now.max(job.updated_at + Duration::milliseconds(1));
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

fn validate_trigger_url(raw: &str) -> Result<(), ValidationError> {
    let parsed = url::Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::InvalidUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
