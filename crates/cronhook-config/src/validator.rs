//! Configuration validation.

use crate::schema::Config;

/// Longest trigger timeout accepted, in seconds.
pub const MAX_TRIGGER_TIMEOUT_SECS: u64 = 600;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_trigger(config, &mut result);
        Self::validate_store(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if let Err(e) = config.scheduler.zone() {
            result.add_error(ValidationError::new("scheduler.timezone", e.to_string()));
        }

        if config.scheduler.preload_future_jobs {
            result.add_warning(ValidationWarning::new(
                "scheduler.preload_future_jobs",
                "future-dated jobs will be armed at startup",
            ));
        }
    }

    fn validate_trigger(config: &Config, result: &mut ValidationResult) {
        let timeout = config.trigger.timeout_seconds;
        if timeout == 0 {
            result.add_error(ValidationError::new(
                "trigger.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        } else if timeout > MAX_TRIGGER_TIMEOUT_SECS {
            result.add_error(ValidationError::new(
                "trigger.timeout_seconds",
                format!("timeout_seconds must not exceed {}", MAX_TRIGGER_TIMEOUT_SECS),
            ));
        }

        match config.trigger.method.to_ascii_uppercase().as_str() {
            "GET" | "POST" => {}
            other => result.add_error(ValidationError::new(
                "trigger.method",
                format!("Unsupported trigger method: {}", other),
            )),
        }

        if config.trigger.api_key_header.trim().is_empty() {
            result.add_error(ValidationError::new(
                "trigger.api_key_header",
                "Header name cannot be empty",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        match config.store.backend.as_str() {
            "sqlite" => {
                if config.store.path.as_os_str().is_empty() {
                    result.add_error(ValidationError::new(
                        "store.path",
                        "SQLite store requires a path",
                    ));
                }
            }
            "memory" => result.add_warning(ValidationWarning::new(
                "store.backend",
                "memory store loses all jobs on restart",
            )),
            other => result.add_error(ValidationError::new(
                "store.backend",
                format!("Unknown store backend: {}", other),
            )),
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
