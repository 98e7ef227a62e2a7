//! Layered configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. Project file: `./popm-exam.toml` or `./.popm-exam.toml`
//! 3. Explicit `--config` file
//! 4. `POPM_` environment variables, `__` separating sections
//!    (`POPM_LLM__MODEL=llama3.2`)
//!
//! `ANTHROPIC_API_KEY` fills in the API key when none of the above set one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::backend::backoff::BackoffPreset;
use crate::backend::{anthropic, AnthropicBackend, Backend, LlmConfig, OllamaBackend};
use crate::error::{ExamError, Result};
use crate::generator::LlmGenerator;
use crate::prompt::{default_topics, QuestionPrompt};

const PROJECT_FILES: [&str; 2] = ["popm-exam.toml", ".popm-exam.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => anthropic::DEFAULT_BASE_URL,
            Provider::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::Ollama => "llama3.2",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ExamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            other => Err(ExamError::InvalidConfig(format!("unknown provider '{}'", other))),
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Falls back to the provider's default model.
    pub model: Option<String>,
    /// Falls back to the provider's public endpoint.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub backoff: BackoffPreset,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            base_url: None,
            api_key: None,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 4000,
            timeout_seconds: 120,
            backoff: BackoffPreset::default(),
        }
    }
}

impl LlmSettings {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// `[bank]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankSettings {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            batch_size: crate::bank::DEFAULT_BATCH_SIZE,
            batch_delay_ms: crate::bank::DEFAULT_BATCH_DELAY.as_millis() as u64,
        }
    }
}

impl BankSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// `[exam]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamSettings {
    pub name: String,
    pub topics: Vec<String>,
    pub default_questions: usize,
    pub default_refresh: usize,
}

impl Default for ExamSettings {
    fn default() -> Self {
        let prompt = QuestionPrompt::default();
        Self {
            name: prompt.exam,
            topics: default_topics(),
            default_questions: 5,
            default_refresh: 10,
        }
    }
}

impl ExamSettings {
    pub fn prompt(&self) -> QuestionPrompt {
        QuestionPrompt::new(self.name.clone(), self.topics.clone())
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub bank: BankSettings,
    pub exam: ExamSettings,
}

impl AppConfig {
    /// Reject settings that would make generation impossible.
    pub fn validate(&self) -> Result<()> {
        if self.bank.batch_size == 0 {
            return Err(ExamError::InvalidConfig("bank.batch_size cannot be 0".into()));
        }
        if self.llm.max_tokens == 0 {
            return Err(ExamError::InvalidConfig("llm.max_tokens cannot be 0".into()));
        }
        if self.llm.model().trim().is_empty() {
            return Err(ExamError::InvalidConfig("llm.model cannot be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ExamError::InvalidConfig(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    /// Build the HTTP generator for the configured provider.
    ///
    /// The hosted provider needs an API key; a missing key is a configuration error.
    pub fn build_generator(&self) -> Result<LlmGenerator> {
        let backend: Arc<dyn Backend> = match self.llm.provider {
            Provider::Anthropic => {
                let key = self
                    .llm
                    .api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        ExamError::InvalidConfig(
                            "no API key: set llm.api_key, POPM_LLM__API_KEY or ANTHROPIC_API_KEY"
                                .into(),
                        )
                    })?;
                Arc::new(AnthropicBackend::new(key))
            }
            Provider::Ollama => Arc::new(OllamaBackend),
        };

        let mut builder = LlmGenerator::builder(self.llm.base_url())
            .backend(backend)
            .backoff(self.llm.backoff.into())
            .model(self.llm.model())
            .timeout(Duration::from_secs(self.llm.timeout_seconds))
            .config(
                LlmConfig::default()
                    .with_temperature(self.llm.temperature)
                    .with_max_tokens(self.llm.max_tokens),
            );
        if let Some(system) = &self.llm.system_prompt {
            builder = builder.system_prompt(system.clone());
        }
        builder.build()
    }
}

/// Loads [`AppConfig`] from files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge every source in priority order and validate the result.
    pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ExamError::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("POPM_").split("__"));

        Self::finish(figment)
    }

    /// Defaults plus the environment only (for `--no-config`).
    pub fn load_defaults() -> Result<AppConfig> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Env::prefixed("POPM_").split("__"));
        Self::finish(figment)
    }

    /// Parse a TOML document on top of the defaults, without files or environment.
    pub fn from_toml_str(toml: &str) -> Result<AppConfig> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml));
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn finish(figment: Figment) -> Result<AppConfig> {
        let mut config: AppConfig = figment.extract().map_err(Box::new)?;
        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        config.validate()?;
        Ok(config)
    }
}
