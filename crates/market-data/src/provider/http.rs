//! Shared HTTP plumbing for REST adapters.
//!
//! Sends one request, maps transport failures and non-2xx statuses into
//! [`ProviderError`], and decodes the JSON body.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ProviderError;
use crate::models::ProviderResult;

/// Default HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt kept in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Common error envelopes returned by crypto data APIs.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client bound to one provider name for error attribution.
#[derive(Clone, Debug)]
pub struct ProviderHttp {
    client: Client,
    provider: &'static str,
}

impl ProviderHttp {
    pub fn new(provider: &'static str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, provider }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send `request` and decode a 2xx JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> ProviderResult<T> {
        debug!("{} request: {}", self.provider, endpoint);

        let response = request.send().await.map_err(|e| ProviderError::Network {
            provider: self.provider.to_string(),
            message: if e.is_timeout() {
                format!("Request to {} timed out", endpoint)
            } else {
                format!("Request to {} failed: {}", endpoint, e)
            },
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ProviderError::Network {
            provider: self.provider.to_string(),
            message: format!("Failed to read response: {}", e),
        })?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: self.provider.to_string(),
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        self.decode(&body)
    }

    /// Decode a response body, attributing failures to this provider.
    pub fn decode<T: DeserializeOwned>(&self, body: &str) -> ProviderResult<T> {
        serde_json::from_str(body).map_err(|e| ProviderError::Parse {
            provider: self.provider.to_string(),
            message: e.to_string(),
        })
    }
}

/// Pull a readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = parsed.message {
            return Some(message);
        }
        match parsed.error {
            Some(serde_json::Value::String(message)) => return Some(message),
            Some(serde_json::Value::Object(map)) => {
                if let Some(serde_json::Value::String(message)) = map.get("message") {
                    return Some(message.clone());
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_BODY).collect())
    }
}
