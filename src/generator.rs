//! The generation boundary: prompt in, raw model text out.
//!
//! [`Generator`] is the only seam between the question bank and an LLM.
//! [`LlmGenerator`] implements it on top of a [`Backend`] with transport
//! retry; tests substitute a [`MockBackend`](crate::backend::MockBackend)
//! or a hand-written [`Generator`].

use crate::backend::{with_backoff, Backend, BackoffConfig, LlmConfig, LlmRequest, OllamaBackend};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Produces raw completion text for a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send `prompt` and return the model's text verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short label for logs and the `debug` command.
    fn describe(&self) -> String;
}

/// [`Generator`] backed by an HTTP LLM provider.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use popm_exam::backend::MockBackend;
/// use popm_exam::generator::LlmGenerator;
///
/// let generator = LlmGenerator::builder("http://localhost:11434")
///     .backend(Arc::new(MockBackend::fixed("[]")))
///     .model("llama3.2")
///     .build()
///     .unwrap();
/// assert_eq!(generator.model(), "llama3.2");
/// ```
pub struct LlmGenerator {
    client: Client,
    base_url: String,
    backend: Arc<dyn Backend>,
    backoff: BackoffConfig,
    model: String,
    system_prompt: Option<String>,
    config: LlmConfig,
}

impl LlmGenerator {
    pub fn builder(base_url: impl Into<String>) -> LlmGeneratorBuilder {
        LlmGeneratorBuilder {
            client: None,
            base_url: base_url.into(),
            backend: None,
            backoff: None,
            model: None,
            system_prompt: None,
            config: LlmConfig::default(),
            timeout: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn request(&self, prompt: &str) -> LlmRequest {
        LlmRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            prompt: prompt.to_string(),
            config: self.config.clone(),
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt);
        debug!(
            backend = self.backend.name(),
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending generation request"
        );

        let response = with_backoff(
            &self.backend,
            &self.client,
            &self.base_url,
            &request,
            &self.backoff,
        )
        .await?;

        info!(
            backend = self.backend.name(),
            status = response.status,
            chars = response.text.len(),
            "received completion"
        );
        if let Some(meta) = &response.metadata {
            debug!("completion metadata: {}", meta);
        }
        debug!("raw completion: {}", response.text);
        Ok(response.text)
    }

    fn describe(&self) -> String {
        format!("{} model {} at {}", self.backend.name(), self.model, self.base_url)
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("backoff", &self.backoff)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`LlmGenerator`].
pub struct LlmGeneratorBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    backoff: Option<BackoffConfig>,
    model: Option<String>,
    system_prompt: Option<String>,
    config: LlmConfig,
    timeout: Option<Duration>,
}

impl LlmGeneratorBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the LLM backend. Default: [`OllamaBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout. Default: 120 seconds.
    ///
    /// Ignored when a custom `Client` is provided via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<LlmGenerator> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
                .build()?,
        };
        Ok(LlmGenerator {
            client,
            base_url: normalize_base_url(&self.base_url),
            backend: self.backend.unwrap_or_else(|| Arc::new(OllamaBackend)),
            backoff: self.backoff.unwrap_or_else(BackoffConfig::none),
            model: self.model.unwrap_or_else(|| "llama3.2".to_string()),
            system_prompt: self.system_prompt,
            config: self.config,
        })
    }
}

/// Strip known provider path suffixes from a base URL.
/// Backends append their own paths, so
/// "https://api.anthropic.com/v1" becomes "https://api.anthropic.com".
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    for suffix in &["/v1/messages", "/v1", "/api/generate", "/api/chat", "/api"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use tokio_test::{assert_err, assert_ok};

    fn generator_with(mock: Arc<MockBackend>) -> LlmGenerator {
        LlmGenerator::builder("http://localhost:11434")
            .backend(mock)
            .model("test-model")
            .build()
            .unwrap()
    }

    #[test]
    fn test_normalize_base_url_strips_suffixes() {
        assert_eq!(normalize_base_url("https://api.anthropic.com/v1"), "https://api.anthropic.com");
        assert_eq!(
            normalize_base_url("https://api.anthropic.com/v1/messages/"),
            "https://api.anthropic.com"
        );
        assert_eq!(normalize_base_url("http://localhost:11434/api"), "http://localhost:11434");
    }

    #[test]
    fn test_normalize_base_url_preserves_clean() {
        assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_generate_returns_text_verbatim() {
        let mock = Arc::new(MockBackend::fixed("```json\n[]\n```"));
        let generator = generator_with(mock.clone());

        let text = assert_ok!(generator.generate("Generate exactly 2").await);
        assert_eq!(text, "```json\n[]\n```");
        assert_eq!(mock.prompts(), vec!["Generate exactly 2"]);
    }

    #[tokio::test]
    async fn test_generate_surfaces_provider_errors() {
        let mock = Arc::new(MockBackend::scripted(vec![MockReply::status(401)]));
        let generator = generator_with(mock);
        assert_err!(generator.generate("p").await);
    }

    #[test]
    fn test_describe_names_backend_and_model() {
        let generator = generator_with(Arc::new(MockBackend::fixed("[]")));
        assert_eq!(
            generator.describe(),
            "mock model test-model at http://localhost:11434"
        );
    }
}
