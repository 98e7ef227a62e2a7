//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over LLM providers, translating between
//! normalized [`LlmRequest`]/[`LlmResponse`] types and provider-specific
//! HTTP APIs. Built-in implementations: [`AnthropicBackend`], [`OllamaBackend`],
//! and [`MockBackend`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! LlmGenerator ──► LlmRequest ──► with_backoff ──► Backend::complete() ──► LlmResponse
//!                                                        │
//!                                     ┌──────────────────┼──────────────┐
//!                              AnthropicBackend     OllamaBackend   MockBackend
//!                               /v1/messages        /api/generate   scripted
//!                                                   /api/chat
//! ```

pub mod anthropic;
pub mod backoff;
pub mod mock;
pub mod ollama;

pub use anthropic::AnthropicBackend;
pub use backoff::BackoffConfig;
pub use mock::{MockBackend, MockReply};
pub use ollama::OllamaBackend;

use crate::error::{ExamError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sampling settings sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// A normalized LLM request.
///
/// [`LlmGenerator`](crate::generator::LlmGenerator) builds this for every
/// prompt; the [`Backend`] translates it into the provider's HTTP request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"claude-3-5-haiku-latest"`, `"llama3.2"`).
    pub model: String,

    /// Optional system prompt.
    pub system_prompt: Option<String>,

    /// The user prompt text.
    pub prompt: String,

    pub config: LlmConfig,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            config: LlmConfig::default(),
        }
    }

    /// The system prompt, if set and non-empty.
    pub fn system(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|s| !s.is_empty())
    }
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, model, stop reason).
    pub metadata: Option<Value>,
}

/// Abstraction over LLM providers.
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one completion call.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether an [`ExamError`] is retryable based on the backoff config.
///
/// Retryable conditions:
/// - [`ExamError::HttpError`] with a status in `config.retryable_statuses`
/// - [`ExamError::Request`] (connection/transport errors)
pub fn is_retryable(error: &ExamError, config: &BackoffConfig) -> bool {
    match error {
        ExamError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        ExamError::Request(_) => true,
        _ => false,
    }
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// Retries transient failures (429, 5xx, connection errors) according to
/// `config`, honouring `Retry-After` (capped at `max_delay`) when the
/// provider sends one. Returns
/// the first successful response, or the last error once retries run out.
pub async fn with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    base_url: &str,
    request: &LlmRequest,
    config: &BackoffConfig,
) -> Result<LlmResponse> {
    let mut last_error: Option<ExamError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = match &last_error {
                Some(ExamError::HttpError {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => (*ra).min(config.max_delay),
                _ => config.delay_for_attempt(attempt - 1),
            };

            let reason = last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            warn!(
                backend = backend.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying after transient failure: {}",
                reason
            );

            tokio::time::sleep(delay).await;
        }

        match backend.complete(client, base_url, request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or(ExamError::Other(
        "backoff loop exited unexpectedly".into(),
    )))
}

/// Parse a Retry-After header value as seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Send a prepared POST and decode the JSON body.
///
/// Non-success statuses become [`ExamError::HttpError`] carrying the body and
/// any `Retry-After` hint.
pub(crate) async fn send_json(request: RequestBuilder, url: &str) -> Result<(Value, u16)> {
    let resp = request.send().await.map_err(|e| {
        if e.is_connect() {
            ExamError::Other(format!("Failed to connect to LLM at {}: {}", url, e))
        } else {
            ExamError::Request(e)
        }
    })?;

    let status = resp.status().as_u16();
    debug!(url, status, "provider responded");

    if !resp.status().is_success() {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let text = resp.text().await.unwrap_or_default();
        return Err(ExamError::HttpError {
            status,
            body: text,
            retry_after,
        });
    }

    let json_resp: Value = resp.json().await?;
    Ok((json_resp, status))
}

/// Copy the named top-level fields of `source` into a metadata object.
pub(crate) fn pick_metadata(source: &Value, fields: &[&str]) -> Option<Value> {
    let meta: serde_json::Map<String, Value> = fields
        .iter()
        .filter_map(|f| source.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect();
    if meta.is_empty() {
        None
    } else {
        Some(Value::Object(meta))
    }
}
