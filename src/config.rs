use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::responder::CompletionSettings;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Tagged persona selecting the default prompt, model and sampling settings
/// for the completion requester.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Concise,
    Friendly,
}

impl Persona {
    fn system_prompt(self) -> &'static str {
        match self {
            Persona::Concise => {
                "You are a helpful assistant in a Telegram chat. \
                 Answer clearly and concisely, in plain text without markdown."
            }
            Persona::Friendly => {
                "You are a warm, upbeat companion chatting on Telegram. \
                 Keep replies short, casual and friendly, and feel free to use an emoji now and then."
            }
        }
    }

    fn model(self) -> &'static str {
        match self {
            Persona::Concise => "gpt-3.5-turbo",
            Persona::Friendly => "gpt-4o-mini",
        }
    }

    fn max_tokens(self) -> u32 {
        match self {
            Persona::Concise => 150,
            Persona::Friendly => 300,
        }
    }

    fn temperature(self) -> f32 {
        match self {
            Persona::Concise => 0.7,
            Persona::Friendly => 0.9,
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Persona::Concise => write!(f, "concise"),
            Persona::Friendly => write!(f, "friendly"),
        }
    }
}

impl FromStr for Persona {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" => Ok(Persona::Concise),
            "friendly" => Ok(Persona::Friendly),
            other => bail!("Unknown persona '{}' (expected 'concise' or 'friendly')", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub persona: Persona,
    /// Absent key puts the bot in fallback-only mode.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    // Per-field overrides of the persona defaults
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            api_key: None,
            base_url: default_base_url(),
            model: None,
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve the persona defaults and any explicit overrides into the
    /// settings used for every completion request.
    pub fn completion_settings(&self) -> CompletionSettings {
        let persona = self.persona;
        CompletionSettings {
            persona,
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| persona.system_prompt().to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| persona.model().to_string()),
            max_tokens: self.max_tokens.unwrap_or_else(|| persona.max_tokens()),
            temperature: self.temperature.unwrap_or_else(|| persona.temperature()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from an optional TOML file plus the process
    /// environment. An explicitly given path must exist; the default
    /// `config.toml` is only read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let contents = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            ),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Some(std::fs::read_to_string(default_path).with_context(|| {
                        format!("Failed to read config file: {}", default_path.display())
                    })?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build the configuration from file contents (if any) and an environment
    /// lookup. Environment values win over the file; empty values count as unset.
    pub fn from_sources<F>(file: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match file {
            Some(contents) => toml::from_str(contents).context("Failed to parse config file")?,
            None => Config::default(),
        };

        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = env("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = token;
        }
        if let Some(key) = env("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(url) = env("OPENAI_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(persona) = env("BOT_PERSONA") {
            config.llm.persona = persona.parse().context("Invalid BOT_PERSONA")?;
        }
        if let Some(model) = env("BOT_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(port) = env("PORT") {
            config.health.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }

        // An all-whitespace key is the same as no key
        if !config.llm.has_api_key() {
            config.llm.api_key = None;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Telegram bot token is missing: set TELEGRAM_BOT_TOKEN or [telegram] bot_token");
        }
        if self.llm.timeout_secs == 0 {
            bail!("[llm] timeout_secs must be greater than zero");
        }
        if self.llm.max_tokens == Some(0) {
            bail!("[llm] max_tokens must be greater than zero");
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("[llm] temperature must be between 0.0 and 2.0, got {}", t);
            }
        }
        Ok(())
    }
}
