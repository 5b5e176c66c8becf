//! Configuration loading and validation for Parley.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides (`PARLEY_*`). Every field has a serde default so an empty
//! file — or no file at all — yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure, mapping directly to `parley.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Extraction service the tool catalogue forwards to.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Gateway (HTTP server) settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// History persistence settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            extraction: ExtractionConfig::default(),
            gateway: GatewayConfig::default(),
            history: HistoryConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("extraction", &self.extraction)
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .field("agent", &self.agent)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// API key. Overridden by `PARLEY_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Base URL of the extraction service.
    #[serde(default = "default_extraction_url")]
    pub base_url: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: default_extraction_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// SQLite database path. Pass ":memory:" for an ephemeral store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Round cap per turn — the only safeguard against runaway tool-calling.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// System prompt override. Empty means the built-in prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Extra project-scoped context appended to the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            system_prompt: None,
            project_context: None,
        }
    }
}

fn default_backend_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "google/gemini-3-flash-preview".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_extraction_url() -> String {
    "http://localhost:3000".into()
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}
fn default_db_path() -> String {
    "data/parley.db".into()
}
fn default_max_rounds() -> u32 {
    10
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take precedence over file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("PARLEY_API_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("PARLEY_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.backend.model = model;
        }
        if let Ok(url) = std::env::var("PARLEY_EXTRACTION_URL") {
            self.extraction.base_url = url;
        }
        if let Ok(path) = std::env::var("PARLEY_DB_PATH") {
            self.history.db_path = path;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_rounds must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::Invalid(format!(
                "backend.temperature {} out of range [0.0, 2.0]",
                self.backend.temperature
            )));
        }
        Ok(())
    }
}
