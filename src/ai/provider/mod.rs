//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for one-shot text generation.
//! Providers return the raw model text; coercion into JSON happens in
//! `ai::validation` so every endpoint shares one recovery path.

mod gemini;
mod openai;
mod prompt_utils;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt_utils::build_schema_prompt;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{NarraError, Result};

// =============================================================================
// Request
// =============================================================================

/// One model request: a system instruction plus a user prompt.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    /// Overrides the provider's configured temperature
    pub temperature: Option<f32>,
    /// Endpoint-native response schema (single-phase shape)
    pub response_schema: Option<Value>,
    pub response_mime_type: Option<String>,
}

impl GenerationRequest {
    pub fn new(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Constrain the response to JSON matching `schema`
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self.response_mime_type = Some("application/json".to_string());
        self
    }
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Raw model output plus usage metrics. The text is opaque and never persisted.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with text only (usage unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// From OpenAI-style `usage` block
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// From Gemini-style `usageMetadata` block
    pub fn from_gemini(prompt_token_count: u32, candidates_token_count: u32) -> Self {
        Self {
            input_tokens: prompt_token_count,
            output_tokens: candidates_token_count,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Wall clock time in milliseconds
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across agent calls.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are never serialized and are redacted in debug output.
/// Each provider converts the key to SecretString at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "openai"
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    8192
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: llm.model.clone(),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: llm.api_key.clone(),
            api_key_env: llm.api_key_env.clone(),
            api_base: llm.api_base.clone(),
            max_tokens: llm.max_tokens,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config, then from `api_key_env`, then from
    /// `fallback_env` (the provider's conventional variable).
    ///
    /// Absent key is `ConfigurationMissing`; a blank key is `InvalidCredentials`.
    pub fn resolve_api_key(&self, fallback_env: &str) -> Result<SecretString> {
        let env_name = self.api_key_env.as_deref().unwrap_or(fallback_env);
        let key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(env_name).ok())
            .ok_or_else(|| {
                NarraError::ConfigurationMissing(format!(
                    "{} API key (set {} or llm.api_key)",
                    self.provider, env_name
                ))
            })?;

        if key.trim().is_empty() {
            return Err(NarraError::InvalidCredentials(format!(
                "{} API key is empty",
                self.provider
            )));
        }

        Ok(SecretString::from(key.trim().to_string()))
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Issue exactly one request and return the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration.
///
/// Fails before any network activity when the key is missing or blank.
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        _ => Err(NarraError::Config(format!(
            "Unknown provider: {}. Supported: gemini, openai",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_env(env_name: &str) -> ProviderConfig {
        ProviderConfig {
            api_key_env: Some(env_name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_key_is_configuration_missing() {
        let config = config_with_env("NARRASCOPE_PROVIDER_TEST_UNSET_KEY");
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, NarraError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("NARRASCOPE_PROVIDER_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_blank_key_is_invalid_credentials() {
        let config = ProviderConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config).err().unwrap(),
            NarraError::InvalidCredentials(_)
        ));
    }

    #[test]
    fn test_unknown_provider() {
        let config = ProviderConfig {
            provider: "carrier-pigeon".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config).err().unwrap(),
            NarraError::Config(_)
        ));
    }

    #[test]
    fn test_create_known_providers() {
        for name in ["gemini", "openai"] {
            let config = ProviderConfig {
                provider: name.to_string(),
                model: Some("m".to_string()),
                api_key: Some("key".to_string()),
                ..Default::default()
            };
            let provider = create_provider(&config).unwrap();
            assert_eq!(provider.name(), name);
            assert_eq!(provider.model(), "m");
        }
    }

    #[test]
    fn test_openai_from_default_llm_config_uses_openai_defaults() {
        let llm = LlmConfig {
            provider: "openai".to_string(),
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let config = ProviderConfig::from(&llm);
        assert_eq!(config.model, None);
        assert_eq!(config.api_key_env, None);

        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");

        let keyless = ProviderConfig {
            api_key: None,
            ..config
        };
        let err = keyless
            .resolve_api_key("NARRASCOPE_OPENAI_FALLBACK_TEST_KEY")
            .unwrap_err()
            .to_string();
        assert!(err.contains("NARRASCOPE_OPENAI_FALLBACK_TEST_KEY"));
        assert!(!err.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_generation_request_with_schema() {
        let request = GenerationRequest::new("sys", "prompt").with_schema(json!({"type": "object"}));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert!(request.response_schema.is_some());
        assert!(request.temperature.is_none());
    }

    #[test]
    fn test_token_usage_total() {
        assert_eq!(TokenUsage::from_gemini(10, 5).total(), 15);
        assert_eq!(TokenUsage::from_openai(100, 50).total(), 150);
    }
}
