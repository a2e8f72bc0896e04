//! Outbound trigger contract.

use async_trait::async_trait;

use crate::error::TriggerError;
use crate::job::ApiKey;

/// Performs the outbound HTTP call for a firing.
#[async_trait]
pub trait TriggerClient: Send + Sync {
    /// Call `url`, presenting `api_key` as the credential header.
    ///
    /// A non-success status is still `Ok`; only transport-level problems
    /// are errors.
    async fn invoke(&self, url: &str, api_key: &ApiKey) -> Result<TriggerResponse, TriggerError>;
}

/// What came back from the trigger endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub status_code: u16,
    pub body_text: String,
    /// The body parsed as JSON, when it is valid JSON.
    pub parsed_payload: Option<serde_json::Value>,
}

impl TriggerResponse {
    /// Build a response, parsing the body as JSON when possible.
    pub fn from_body(status_code: u16, body_text: impl Into<String>) -> Self {
        let body_text = body_text.into();
        let parsed_payload = serde_json::from_str(&body_text).ok();
        Self {
            status_code,
            body_text,
            parsed_payload,
        }
    }

    /// 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
