use std::sync::Arc;

use crate::ai::{ClaudeClient, GeminiClient, OllamaClient, OpenAIClient};
use crate::config::Config;
use crate::error::ModelInvocationError;
use crate::model::SharedBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
    Claude,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::Ollama => "ollama",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" | "googleai" => Some(Provider::Gemini),
            "openai" => Some(Provider::OpenAI),
            "claude" | "anthropic" => Some(Provider::Claude),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Gemini, Provider::OpenAI, Provider::Claude, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google AI)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    /// Environment variables checked for an API key, in order.
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Provider::OpenAI => &["OPENAI_API_KEY"],
            Provider::Claude => &["ANTHROPIC_API_KEY"],
            Provider::Ollama => &[],
        }
    }

    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    pub fn supports_images(&self) -> bool {
        matches!(self, Provider::Gemini | Provider::OpenAI)
    }

    /// Built-in reasoning models offered in the model picker.
    ///
    /// Ollama's list comes from the running server instead.
    pub fn known_models(&self) -> Vec<String> {
        match self {
            Provider::Gemini => GeminiClient::list_models(),
            Provider::OpenAI => OpenAIClient::list_models(),
            Provider::Claude => ClaudeClient::list_models(),
            Provider::Ollama => Vec::new(),
        }
    }
}

/// Build the backend for a provider from config.
pub fn build_backend(provider: Provider, config: &Config) -> Result<SharedBackend, ModelInvocationError> {
    let timeouts = config.timeouts();
    // Stored model names belong to the configured provider only
    let own_models = config.provider() == provider;
    let reasoning_model = config.reasoning_model.as_deref().filter(|_| own_models);
    let image_model = config.image_model.as_deref().filter(|_| own_models);

    let key = || {
        config
            .api_key(provider)
            .ok_or(ModelInvocationError::MissingApiKey { provider: provider.display_name() })
    };

    let backend: SharedBackend = match provider {
        Provider::Gemini => Arc::new(
            GeminiClient::new(&key()?, reasoning_model, image_model, timeouts)?
                .with_base_url(config.gemini_url()),
        ),
        Provider::OpenAI => Arc::new(OpenAIClient::new(&key()?, reasoning_model, image_model, timeouts)?),
        Provider::Claude => Arc::new(ClaudeClient::new(&key()?, reasoning_model, timeouts)?),
        Provider::Ollama => Arc::new(OllamaClient::new(config.ollama_url(), reasoning_model, timeouts)?),
    };
    tracing::info!(
        provider = provider.as_str(),
        reasoning_model = backend.reasoning_model(),
        image_model = backend.image_model(),
        "model backend ready"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("Anthropic"), Some(Provider::Claude));
        assert_eq!(Provider::from_str("nope"), None);
    }

    #[test]
    fn only_gemini_and_openai_make_images() {
        let with_images: Vec<_> = Provider::all().into_iter().filter(|p| p.supports_images()).collect();
        assert_eq!(with_images, vec![Provider::Gemini, Provider::OpenAI]);
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = Config::new();
        let backend = build_backend(Provider::Ollama, &config).unwrap();
        assert_eq!(backend.name(), "Ollama");
        assert_eq!(backend.reasoning_model(), crate::ai::ollama::DEFAULT_REASONING_MODEL);
    }

    #[test]
    fn stored_key_builds_claude() {
        let mut config = Config::new();
        config.switch_provider(Provider::Claude);
        config.set_api_key(Provider::Claude, "test-key");
        config.reasoning_model = Some("claude-3-5-haiku-20241022".into());
        let backend = build_backend(Provider::Claude, &config).unwrap();
        assert_eq!(backend.reasoning_model(), "claude-3-5-haiku-20241022");
    }

    #[test]
    fn models_of_another_provider_are_ignored() {
        let mut config = Config::new();
        config.reasoning_model = Some("gemini-2.5-pro".into());
        config.set_api_key(Provider::Claude, "test-key");

        let backend = build_backend(Provider::Claude, &config).unwrap();
        assert_eq!(backend.reasoning_model(), crate::ai::claude::DEFAULT_REASONING_MODEL);
    }
}
