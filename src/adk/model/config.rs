// SPDX-License-Identifier: MIT

//! Explicit model configuration
//!
//! Values come from the environment (after `dotenv` in `main`) but are read
//! once into a [`ModelConfig`] that callers pass around.

use super::GenerationConfig;
use crate::adk::error::{LangkitError, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
}

impl Provider {
    /// Infer the provider from a model name, defaulting to Gemini
    pub fn infer(model_name: &str) -> Self {
        let o_series = model_name
            .strip_prefix('o')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));
        if model_name.starts_with("gpt") || o_series {
            Provider::OpenAI
        } else if model_name.starts_with("claude") {
            Provider::Anthropic
        } else {
            Provider::Gemini
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GOOGLE_API_KEY",
        }
    }

    pub fn base_url_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_BASE_URL",
            Provider::Anthropic => "ANTHROPIC_BASE_URL",
            Provider::Gemini => "GOOGLE_BASE_URL",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(ModelError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Everything needed to construct a model client
#[derive(Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model_name: String,
    pub api_key: String,
    pub base_url: String,
    pub generation: GenerationConfig,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("generation", &self.generation)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelConfig {
    pub fn new(
        provider: Provider,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            generation: GenerationConfig::default(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Load from the process environment
    pub fn from_env(model_name: &str, provider: Option<&str>) -> Result<Self> {
        Self::from_lookup(model_name, provider, |key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// An explicit `provider` wins over `MODEL_PROVIDER`, which wins over
    /// inference from the model name.
    pub fn from_lookup<F>(model_name: &str, provider: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match provider
            .map(str::to_string)
            .or_else(|| lookup("MODEL_PROVIDER"))
        {
            Some(p) => p.parse::<Provider>()?,
            None => Provider::infer(model_name),
        };

        let api_key = lookup(provider.api_key_var())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ModelError::ApiKeyMissing(provider.to_string()))?;

        let mut config = Self::new(provider, model_name, api_key);
        if let Some(base_url) = lookup(provider.base_url_var()) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        config.generation.temperature = parse_var(&lookup, "LANGKIT_TEMPERATURE")?;
        config.generation.max_output_tokens = parse_var(&lookup, "LANGKIT_MAX_TOKENS")?;
        config.timeout =
            parse_var::<u64, _>(&lookup, "LANGKIT_TIMEOUT_SECS")?.map(Duration::from_secs);

        log::debug!("Loaded model config: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LangkitError::config(format!("{} = '{}': {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_infer_provider() {
        assert_eq!(Provider::infer("gpt-4o-mini"), Provider::OpenAI);
        assert_eq!(Provider::infer("o3-mini"), Provider::OpenAI);
        assert_eq!(Provider::infer("claude-3-5-haiku-latest"), Provider::Anthropic);
        assert_eq!(Provider::infer("gemini-2.0-flash"), Provider::Gemini);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn test_from_lookup_infers_and_reads_key() {
        let config = ModelConfig::from_lookup(
            "claude-3-5-haiku-latest",
            None,
            lookup_from(&[("ANTHROPIC_API_KEY", "sk-ant"), ("LANGKIT_TEMPERATURE", "0.2")]),
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.api_key, "sk-ant");
        assert_eq!(config.base_url, "https://api.anthropic.com/v1");
        assert_eq!(config.generation.temperature, Some(0.2));
        assert_eq!(config.generation.max_output_tokens, None);
    }

    #[test]
    fn test_explicit_provider_overrides_env() {
        let config = ModelConfig::from_lookup(
            "my-proxy-model",
            Some("openai"),
            lookup_from(&[
                ("MODEL_PROVIDER", "Gemini"),
                ("OPENAI_API_KEY", "sk"),
                ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ]),
        )
        .unwrap();

        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let err = ModelConfig::from_lookup("gpt-4o", None, lookup_from(&[])).unwrap_err();
        assert!(matches!(err, LangkitError::Model(ModelError::ApiKeyMissing(_))));
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = ModelConfig::from_lookup(
            "gpt-4o",
            None,
            lookup_from(&[("OPENAI_API_KEY", "sk"), ("LANGKIT_MAX_TOKENS", "lots")]),
        )
        .unwrap_err();
        assert!(matches!(err, LangkitError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ModelConfig::new(Provider::OpenAI, "gpt-4o", "secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
