//! HTTP implementation of [`GenerativeBackend`] for the Gemini REST API.
//!
//! # Examples
//!
//! ```rust,no_run
//! use comforter::gemini::{GeminiClient, GeminiConfig, GenerateContentRequest, GenerativeBackend};
//!
//! # async fn example() -> Result<(), comforter::ComforterError> {
//! let client = GeminiClient::new(GeminiConfig::new("AIza..."))?;
//! let request = GenerateContentRequest::from_text("Suggest a soup");
//! let response = client.generate_content("gemini-3-flash-preview", &request).await?;
//! println!("{:?}", response.text());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::GenerativeBackend;
use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::config::ApiConfig;
use crate::error::{ComforterError, Result};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Base URL without the version segment.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    /// Create a config with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(90),
        }
    }

    /// Build from application config, resolving the credential.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::ServiceUnavailable`] when no credential is available.
    pub fn from_api_config(api: &ApiConfig) -> Result<Self> {
        Ok(Self::new(api.resolve_api_key()?)
            .with_base_url(api.base_url.clone())
            .with_timeout(Duration::from_secs(api.request_timeout_secs.max(1))))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::ServiceUnavailable`] for a blank key and
    /// [`ComforterError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ComforterError::ServiceUnavailable(
                "Gemini API key is empty".to_owned(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ComforterError::RequestFailed(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_owned()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/v1beta/{model_path}:generateContent", self.config.base_url)
    }

    /// Map an HTTP error status to the appropriate error kind.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> ComforterError {
        let (message, api_status) = extract_error_details(body);
        if is_rate_limit_signal(Some(status.as_u16()), api_status.as_deref().unwrap_or(body)) {
            return ComforterError::RateLimited(format!("Gemini rate limited: {message}"));
        }
        match status.as_u16() {
            401 | 403 => ComforterError::ServiceUnavailable(format!(
                "Gemini rejected the API credential: {message}"
            )),
            _ if message.to_ascii_lowercase().contains("safety") => {
                ComforterError::SafetyBlocked(format!("Gemini blocked the request: {message}"))
            }
            code => ComforterError::RequestFailed(format!("Gemini HTTP {code}: {message}")),
        }
    }
}

/// The single rate-limit classifier for backend failures.
///
/// True for HTTP 429, or when the error text carries the `RESOURCE_EXHAUSTED`
/// status, regardless of the HTTP code it arrived with.
pub fn is_rate_limit_signal(status: Option<u16>, text: &str) -> bool {
    status == Some(429) || text.contains("RESOURCE_EXHAUSTED")
}

/// Extract `(message, status)` from a Google API error body.
fn extract_error_details(body: &str) -> (String, Option<String>) {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_owned());
    let status = error
        .and_then(|e| e.get("status"))
        .and_then(|s| s.as_str())
        .map(String::from);
    (message, status)
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint_for_model(model);
        debug!(model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ComforterError::RequestFailed(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let body = response.text().await.map_err(|e| {
            ComforterError::RequestFailed(format!("Gemini response body unreadable: {e}"))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            ComforterError::RequestFailed(format!("Gemini response envelope invalid: {e}"))
        })
    }
}
