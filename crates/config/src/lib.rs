//! Configuration loading, validation, and management for CodeClaw.
//!
//! Loads configuration from `~/.codeclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use codeclaw_core::Mode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Models offered by the `/models` command.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    (
        "devstral-small-2505",
        "Devstral Small - Efficient coding model (128k context)",
    ),
    (
        "devstral-medium-2507",
        "Devstral Medium - High-performance coding model (128k context)",
    ),
];

/// The root configuration structure.
///
/// Maps directly to `~/.codeclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Inline custom instructions (takes precedence over the project file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".into()
}
fn default_model() -> String {
    "devstral-medium-2507".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4000
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
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("custom_instructions", &self.custom_instructions.is_some())
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool rounds allowed per non-streaming submission
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Tool rounds allowed per streaming submission
    #[serde(default = "default_max_stream_rounds")]
    pub max_stream_rounds: u32,

    /// Context window budget in tokens
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Mode the session starts in
    #[serde(default)]
    pub default_mode: Mode,
}

fn default_max_rounds() -> u32 {
    10
}
fn default_max_stream_rounds() -> u32 {
    30
}
fn default_max_context_tokens() -> usize {
    128_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_stream_rounds: default_max_stream_rounds(),
            max_context_tokens: default_max_context_tokens(),
            default_mode: Mode::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// LinkUp API key for the web_search tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkup_api_key: Option<String>,

    /// Timeout for a single bash command
    #[serde(default = "default_bash_timeout")]
    pub bash_timeout_secs: u64,
}

fn default_bash_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            linkup_api_key: None,
            bash_timeout_secs: default_bash_timeout(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("linkup_api_key", &redact(&self.linkup_api_key))
            .field("bash_timeout_secs", &self.bash_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codeclaw/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CODECLAW_API_KEY` (highest priority), then `MISTRAL_API_KEY`
    /// - `LINKUP_API_KEY`
    /// - `CODECLAW_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` so tests need not touch
    /// the process environment.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("CODECLAW_API_KEY").or_else(|| lookup("MISTRAL_API_KEY")) {
            self.api_key = Some(key);
        }

        if self.tools.linkup_api_key.is_none() {
            self.tools.linkup_api_key = lookup("LINKUP_API_KEY");
        }

        if let Some(model) = lookup("CODECLAW_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codeclaw")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_rounds == 0 || self.agent.max_stream_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds and agent.max_stream_rounds must be > 0".into(),
            ));
        }

        if self.agent.max_context_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_context_tokens must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether `model` is one of the known models.
    pub fn is_known_model(model: &str) -> bool {
        AVAILABLE_MODELS.iter().any(|(name, _)| *name == model)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            custom_instructions: None,
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
