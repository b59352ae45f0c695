//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/narrascope/config.toml)
//! 3. Project config (.narrascope/config.toml)
//! 4. Environment variables (NARRASCOPE_* prefix)
//!
//! Env keys split on `_`, so only single-word fields (`NARRASCOPE_LLM_MODEL`,
//! `NARRASCOPE_DATASET_URL`) are reachable that way. API keys are read through
//! the variable named by `api_key_env` instead.

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::types::Config;
use crate::constants::storage;
use crate::types::{NarraError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // NARRASCOPE_LLM_MODEL -> llm.model
        figment = figment.merge(Env::prefixed("NARRASCOPE_").split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| NarraError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| NarraError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (~/.config/narrascope/ on Linux)
    pub fn global_dir() -> Option<PathBuf> {
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("narrascope"));
        }
        ProjectDirs::from("", "", "narrascope").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(storage::DATA_DIR)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the current effective configuration
    pub fn render_config(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            _ => toml::to_string_pretty(config).map_err(|e| NarraError::Config(e.to_string())),
        }
    }

    /// Show current effective configuration
    pub fn show_config(format: &str) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render_config(&config, format)?);
        Ok(())
    }

    /// Edit config file with default editor
    pub fn edit_config(global: bool) -> Result<()> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                NarraError::Config("Cannot determine global config path".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        if !path.exists() {
            println!("Config file does not exist: {}", path.display());
            println!(
                "Run: narrascope config init {}",
                if global { "--global" } else { "" }
            );
            return Ok(());
        }

        let editor = env::var("EDITOR").unwrap_or_else(|_| {
            if cfg!(target_os = "macos") {
                "open".to_string()
            } else if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        });

        let status = Command::new(&editor).arg(&path).status().map_err(|e| {
            NarraError::Config(format!("Failed to launch editor {}: {}", editor, e))
        })?;

        if !status.success() {
            return Err(NarraError::Config("Editor exited with error".to_string()));
        }

        println!("Config saved: {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            NarraError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_config(&global_dir, Self::default_global_config(), force)
    }

    /// Initialize project configuration under `base` (usually the cwd)
    pub fn init_project(base: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = base.join(storage::DATA_DIR);
        Self::write_config(&project_dir, Self::default_project_config(), force)
    }

    fn write_config(dir: &Path, content: &str, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, content)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> &'static str {
        r#"# narrascope Global Configuration
# User-wide defaults. Settings in .narrascope/config.toml override these.

version = "1.0"

[llm]
provider = "gemini"
# Defaults follow the provider: gemini-2.5-flash / GEMINI_API_KEY for gemini,
# gpt-4o-mini / OPENAI_API_KEY for openai
# model = "gemini-2.5-flash"
# api_key_env = "GEMINI_API_KEY"
temperature = 0.4
timeout_secs = 300

[quota]
daily_limit = 3
guest_limit = 3
"#
    }

    fn default_project_config() -> &'static str {
        r#"# narrascope Project Configuration

version = "1.0"

[dataset]
# CSV endpoint fetched before every analysis
# url = "https://example.com/export.csv"
timeout_secs = 60

[pipeline]
shape = "two-phase"
agent_dataset_chars = 8000
synthesis_dataset_chars = 3000
fallback_extract_summary = true

[email]
enabled = false
api_key_env = "EMAIL_API_KEY"
# from = "reports@example.com"

[storage]
database = ".narrascope/narrascope.db"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineShape;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let config = ConfigLoader::load().unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_init_project_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();

        let path = ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        assert!(path.exists());
        assert!(temp_dir.path().join(".narrascope").is_dir());

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.pipeline.shape, PipelineShape::TwoPhase);
        assert_eq!(config.pipeline.synthesis_dataset_chars, 3000);
        assert!(!config.email.enabled);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        fs::write(&path, "version = \"custom\"\n").unwrap();

        ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::init_project(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[pipeline]"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[pipeline]\nshape = \"single-phase\"\n\n[quota]\nguest_limit = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.pipeline.shape, PipelineShape::SinglePhase);
        assert_eq!(config.quota.guest_limit, 5);
        assert_eq!(config.quota.daily_limit, 3);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[llm]\ntemperature = 9.0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(NarraError::Config(_))
        ));
    }

    #[test]
    fn test_env_override() {
        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("NARRASCOPE_LLM_MODEL", "test-model");
        }
        let config = ConfigLoader::load().unwrap();
        assert_eq!(config.llm.model.as_deref(), Some("test-model"));
        unsafe {
            std::env::remove_var("NARRASCOPE_LLM_MODEL");
        }
    }

    #[test]
    fn test_render_config_formats() {
        let config = Config::default();
        let toml_text = ConfigLoader::render_config(&config, "toml").unwrap();
        assert!(toml_text.contains("[pipeline]"));
        let json_text = ConfigLoader::render_config(&config, "json").unwrap();
        assert!(json_text.contains("\"daily_limit\": 3"));
        let yaml_text = ConfigLoader::render_config(&config, "yaml").unwrap();
        assert!(yaml_text.contains("guest_limit: 3"));
    }
}
