//! reqwest-backed trigger client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::debug;

use cronhook_protocols::{ApiKey, TriggerClient, TriggerError, TriggerResponse};

/// HTTP method used for trigger calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMethod {
    Get,
    #[default]
    Post,
}

impl TriggerMethod {
    fn as_method(self) -> Method {
        match self {
            TriggerMethod::Get => Method::GET,
            TriggerMethod::Post => Method::POST,
        }
    }
}

impl FromStr for TriggerMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(TriggerMethod::Get),
            "POST" => Ok(TriggerMethod::Post),
            _ => Err(format!("unsupported trigger method: {}", s)),
        }
    }
}

impl fmt::Display for TriggerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Settings for [`HttpTriggerClient`].
#[derive(Debug, Clone)]
pub struct TriggerClientConfig {
    pub timeout: Duration,
    pub method: TriggerMethod,
    /// Header carrying the job's API key.
    pub api_key_header: String,
    pub user_agent: String,
}

impl Default for TriggerClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            method: TriggerMethod::Post,
            api_key_header: "x-api-key".to_string(),
            user_agent: concat!("cronhook/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Calls trigger URLs over HTTP.
pub struct HttpTriggerClient {
    client: Client,
    method: TriggerMethod,
    api_key_header: HeaderName,
    timeout: Duration,
}

impl HttpTriggerClient {
    pub fn new(config: TriggerClientConfig) -> Result<Self, TriggerError> {
        let api_key_header =
            HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
                TriggerError::InvalidHeader(format!("{}: {}", config.api_key_header, e))
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TriggerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            method: config.method,
            api_key_header,
            timeout: config.timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> TriggerError {
        if e.is_timeout() {
            TriggerError::Timeout(self.timeout)
        } else {
            TriggerError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl TriggerClient for HttpTriggerClient {
    async fn invoke(&self, url: &str, api_key: &ApiKey) -> Result<TriggerResponse, TriggerError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| TriggerError::InvalidUrl(format!("{}: {}", url, e)))?;

        // Never echo the key itself into the error.
        let mut key = HeaderValue::from_str(api_key.expose()).map_err(|_| {
            TriggerError::InvalidHeader(format!("API key {} is not a valid header value", api_key))
        })?;
        key.set_sensitive(true);

        debug!(url = %parsed, method = %self.method, api_key = %api_key, "Calling trigger");

        let response = self
            .client
            .request(self.method.as_method(), parsed)
            .header(self.api_key_header.clone(), key)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!(status, bytes = body.len(), "Trigger responded");

        Ok(TriggerResponse::from_body(status, body))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
