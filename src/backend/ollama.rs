//! Backend for Ollama's native API.
//!
//! [`OllamaBackend`] translates normalized [`LlmRequest`]s into Ollama's
//! `/api/generate` and `/api/chat` endpoints, always non-streaming.

use super::{pick_metadata, send_json, Backend, LlmRequest, LlmResponse};
use crate::error::{ExamError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const METADATA_FIELDS: [&str; 5] = [
    "total_duration",
    "eval_count",
    "eval_duration",
    "prompt_eval_count",
    "model",
];

/// Backend for a local or remote Ollama server.
///
/// Uses `/api/chat` when a non-empty system prompt is set and
/// `/api/generate` otherwise.
#[derive(Debug, Clone, Default)]
pub struct OllamaBackend;

impl OllamaBackend {
    fn build_options(request: &LlmRequest) -> Value {
        json!({
            "temperature": request.config.temperature,
            "num_predict": request.config.max_tokens,
        })
    }

    fn use_chat(request: &LlmRequest) -> bool {
        request.system().is_some()
    }

    fn build_generate_body(request: &LlmRequest) -> Value {
        json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": Self::build_options(request),
        })
    }

    fn build_chat_body(request: &LlmRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(sys) = request.system() {
            messages.push(json!({"role": "system", "content": sys}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": Self::build_options(request),
        })
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let base = base_url.trim_end_matches('/');
        let chat = Self::use_chat(request);

        let (url, body) = if chat {
            (format!("{}/api/chat", base), Self::build_chat_body(request))
        } else {
            (format!("{}/api/generate", base), Self::build_generate_body(request))
        };

        let (json_resp, status) = send_json(client.post(&url).json(&body), &url).await?;

        let text = if chat {
            json_resp.get("message").and_then(|m| m.get("content"))
        } else {
            json_resp.get("response")
        }
        .and_then(Value::as_str)
        .ok_or(ExamError::EmptyCompletion { provider: "ollama" })?
        .to_string();

        Ok(LlmResponse {
            text,
            status,
            metadata: pick_metadata(&json_resp, &METADATA_FIELDS),
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmConfig;

    fn test_request() -> LlmRequest {
        LlmRequest {
            model: "llama3.2".into(),
            system_prompt: None,
            prompt: "Generate exactly 5 multiple-choice questions".into(),
            config: LlmConfig::default(),
        }
    }

    #[test]
    fn test_ollama_backend_generate_payload() {
        let body = OllamaBackend::build_generate_body(&test_request());

        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Generate exactly 5 multiple-choice questions");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.7);
        assert_eq!(body["options"]["num_predict"], 4000);
    }

    #[test]
    fn test_ollama_backend_chat_payload() {
        let mut request = test_request();
        request.system_prompt = Some("You write exam questions.".into());

        let body = OllamaBackend::build_chat_body(&request);
        let messages = body["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], request.prompt);
    }

    #[test]
    fn test_ollama_backend_use_chat_logic() {
        let mut request = test_request();
        assert!(!OllamaBackend::use_chat(&request));

        request.system_prompt = Some("You write exam questions.".into());
        assert!(OllamaBackend::use_chat(&request));

        request.system_prompt = Some(String::new());
        assert!(!OllamaBackend::use_chat(&request));
    }

    #[test]
    fn test_ollama_backend_respects_config() {
        let mut request = test_request();
        request.config = LlmConfig::default().with_temperature(0.2).with_max_tokens(900);

        let body = OllamaBackend::build_generate_body(&request);
        assert_eq!(body["options"]["temperature"], 0.2);
        assert_eq!(body["options"]["num_predict"], 900);
    }
}
