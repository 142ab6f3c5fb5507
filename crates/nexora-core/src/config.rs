use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::ai::Timeouts;
use crate::provider::Provider;
use crate::tabs::ChatFailurePolicy;

pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub reasoning_model: Option<String>,
    pub image_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub ollama_url: Option<String>,
    /// Gemini endpoint override, e.g. a proxy.
    pub gemini_url: Option<String>,
    pub reveal_interval_ms: Option<u64>,
    pub chat_failure_policy: Option<ChatFailurePolicy>,
    pub image_dir: Option<PathBuf>,
    /// Command that writes one still frame (PNG or JPEG) to stdout.
    pub camera_command: Option<Vec<String>>,
    /// Command that records one utterance and prints its transcript.
    pub speech_command: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("nexora"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Selected provider; unknown names fall back to Gemini.
    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    /// API key for a provider. Environment variables win over stored keys.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let from_env = provider
            .env_vars()
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
        from_env.or_else(|| self.stored_key(provider).cloned())
    }

    /// Select a provider, forgetting model choices made for a different one.
    pub fn switch_provider(&mut self, provider: Provider) {
        if self.provider() != provider {
            self.reasoning_model = None;
            self.image_model = None;
        }
        self.provider = Some(provider.as_str().to_string());
    }

    pub fn stored_key(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Gemini => self.gemini_api_key.as_ref(),
            Provider::OpenAI => self.openai_api_key.as_ref(),
            Provider::Claude => self.claude_api_key.as_ref(),
            Provider::Ollama => None,
        }
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        let key = Some(key.to_string());
        match provider {
            Provider::Gemini => self.gemini_api_key = key,
            Provider::OpenAI => self.openai_api_key = key,
            Provider::Claude => self.claude_api_key = key,
            Provider::Ollama => {}
        }
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url
            .as_deref()
            .unwrap_or(crate::ai::ollama::DEFAULT_BASE_URL)
    }

    pub fn gemini_url(&self) -> &str {
        self.gemini_url
            .as_deref()
            .unwrap_or(crate::ai::gemini::DEFAULT_BASE_URL)
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.unwrap_or(DEFAULT_REVEAL_INTERVAL_MS))
    }

    pub fn chat_failure_policy(&self) -> ChatFailurePolicy {
        self.chat_failure_policy.unwrap_or_default()
    }

    /// Where downloaded images go: configured dir, else the user's pictures dir.
    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .or_else(|| dirs::picture_dir().map(|p| p.join("nexora")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        Timeouts {
            connect: self
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect),
            request: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request),
        }
    }
}
