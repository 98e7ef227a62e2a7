//! Backend for the Anthropic Messages API.
//!
//! Sends `POST {base}/v1/messages` with `x-api-key` and `anthropic-version`
//! headers and joins the `text` blocks of the reply.

use super::{pick_metadata, send_json, Backend, LlmRequest, LlmResponse};
use crate::error::{ExamError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
pub const API_VERSION: &str = "2023-06-01";

const METADATA_FIELDS: [&str; 4] = ["id", "model", "stop_reason", "usage"];

/// Backend for Claude models through the Messages API.
///
/// # Example
///
/// ```
/// use popm_exam::backend::AnthropicBackend;
///
/// let backend = AnthropicBackend::new("sk-ant-test");
/// assert!(!format!("{:?}", backend).contains("sk-ant-test"));
/// ```
#[derive(Clone)]
pub struct AnthropicBackend {
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.config.max_tokens,
            "temperature": request.config.temperature,
            "messages": [
                {"role": "user", "content": request.prompt}
            ],
        });
        if let Some(sys) = request.system() {
            body["system"] = json!(sys);
        }
        body
    }

    /// Concatenate every `text` content block, in order.
    fn extract_text(json: &Value) -> Option<String> {
        let content = json.get("content").and_then(Value::as_array)?;
        let chunks: Vec<&str> = content
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if chunks.is_empty() {
            None
        } else {
            Some(chunks.join("\n"))
        }
    }
}

impl fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let post = client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let (json_resp, status) = send_json(post, &url).await?;

        let text = Self::extract_text(&json_resp).ok_or(ExamError::EmptyCompletion {
            provider: "anthropic",
        })?;

        Ok(LlmResponse {
            text,
            status,
            metadata: pick_metadata(&json_resp, &METADATA_FIELDS),
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
