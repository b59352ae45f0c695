//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/narrascope/) and project (.narrascope/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{network, pipeline, quota, storage};
use crate::types::{NarraError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Dataset source settings
    pub dataset: DatasetConfig,

    /// Multi-agent pipeline settings
    pub pipeline: PipelineConfig,

    /// Usage quota settings
    pub quota: QuotaConfig,

    /// Result email settings
    pub email: EmailConfig,

    /// Local account store settings
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            dataset: DatasetConfig::default(),
            pipeline: PipelineConfig::default(),
            quota: QuotaConfig::default(),
            email: EmailConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `NarraError::Config` on validation failure.
    ///
    /// Missing credentials and URLs are not checked here; they are reported as
    /// `ConfigurationMissing` by the component that needs them.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(NarraError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(NarraError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.dataset.timeout_secs == 0 {
            return Err(NarraError::Config(
                "Dataset timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.agent_dataset_chars == 0 || self.pipeline.synthesis_dataset_chars == 0 {
            return Err(NarraError::Config(
                "Pipeline dataset character caps must be greater than 0".to_string(),
            ));
        }

        if self.email.enabled && self.email.from.trim().is_empty() {
            return Err(NarraError::Config(
                "Email 'from' address is required when email is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini" or "openai"
    pub provider: String,

    /// Model name; the provider's default when unset
    pub model: Option<String>,

    /// API key (prefer `api_key_env`); never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset; the provider's
    /// conventional variable (`GEMINI_API_KEY`, `OPENAI_API_KEY`) when unset
    pub api_key_env: Option<String>,

    /// Custom endpoint base URL
    pub api_base: Option<String>,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum output tokens per call
    pub max_tokens: usize,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            api_key: None,
            api_key_env: None,
            api_base: None,
            temperature: 0.4,
            max_tokens: 8192,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Dataset Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV endpoint fetched before every analysis
    pub url: Option<String>,

    /// Fetch timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: network::DATASET_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Orchestration shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineShape {
    /// Pattern + context in parallel, then synthesis (3 calls)
    #[default]
    TwoPhase,
    /// One schema-constrained call
    SinglePhase,
}

impl std::fmt::Display for PipelineShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineShape::TwoPhase => write!(f, "two-phase"),
            PipelineShape::SinglePhase => write!(f, "single-phase"),
        }
    }
}

impl std::str::FromStr for PipelineShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "two-phase" | "two" | "multi" => Ok(PipelineShape::TwoPhase),
            "single-phase" | "single" => Ok(PipelineShape::SinglePhase),
            _ => Err(format!(
                "Unknown pipeline shape: {}. Valid values: two-phase, single-phase",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub shape: PipelineShape,

    /// Dataset cap for pattern and context agents
    pub agent_dataset_chars: usize,

    /// Dataset cap for the synthesis agent
    pub synthesis_dataset_chars: usize,

    /// Dataset cap for the single-phase prompt (None = whole dataset)
    pub unified_dataset_chars: Option<usize>,

    /// Salvage `overallSummary` from unparseable final responses
    pub fallback_extract_summary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shape: PipelineShape::TwoPhase,
            agent_dataset_chars: pipeline::AGENT_DATASET_CHARS,
            synthesis_dataset_chars: pipeline::SYNTHESIS_DATASET_CHARS,
            unified_dataset_chars: None,
            fallback_extract_summary: true,
        }
    }
}

// =============================================================================
// Quota Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Queries per UTC day for non-subscribers
    pub daily_limit: u32,

    /// Total queries for guests
    pub guest_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: quota::DEFAULT_DAILY_LIMIT,
            guest_limit: quota::DEFAULT_GUEST_LIMIT,
        }
    }
}

// =============================================================================
// Email Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Send results through the HTTP email API (otherwise logged only)
    pub enabled: bool,

    /// Transactional email API base URL
    pub api_base: String,

    /// API key; never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset
    pub api_key_env: String,

    /// Sender address
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: "https://api.resend.com".to_string(),
            api_key: None,
            api_key_env: "EMAIL_API_KEY".to_string(),
            from: String::new(),
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(storage::DATA_DIR).join(storage::DATABASE_FILE),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.pipeline.shape, PipelineShape::TwoPhase);
        assert_eq!(config.quota.daily_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_shape_parse() {
        assert_eq!(PipelineShape::TwoPhase.to_string(), "two-phase");
        assert_eq!(
            "single-phase".parse::<PipelineShape>().unwrap(),
            PipelineShape::SinglePhase
        );
        assert_eq!(
            "Two-Phase".parse::<PipelineShape>().unwrap(),
            PipelineShape::TwoPhase
        );
        assert!("three".parse::<PipelineShape>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(matches!(config.validate(), Err(NarraError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_caps() {
        let mut config = Config::default();
        config.pipeline.synthesis_dataset_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_sender_when_email_enabled() {
        let mut config = Config::default();
        config.email.enabled = true;
        assert!(config.validate().is_err());
        config.email.from = "reports@example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret-key".to_string());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("secret-key"));
    }
}
