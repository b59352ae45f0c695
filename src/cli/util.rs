//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::storage::{AccountStore, Database, SharedDatabase, SqliteAccountStore};
use crate::types::Result;

/// Command execution context
///
/// Commands that only touch accounts use [`CommandContext::store`]; the
/// analysis command builds a full `QueryService` from `config`.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    /// File the configuration was loaded from, when given explicitly
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Load configuration from `config_path` or the layered default sources.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };

        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.config.storage.database
    }

    pub fn open_database(&self) -> Result<SharedDatabase> {
        Ok(Arc::new(Database::open(self.database_path())?))
    }

    /// Open the account store backing users, quotas and history
    pub fn store(&self) -> Result<Arc<dyn AccountStore>> {
        Ok(Arc::new(SqliteAccountStore::new(self.open_database()?)))
    }
}

/// Output format shared by commands that print records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid values: text, json", s)),
        }
    }
}

/// Pretty JSON to stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_context_from_explicit_file_opens_store() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("data").join("accounts.db");
        let config_path = temp.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!("[storage]\ndatabase = {:?}\n", db_path.to_string_lossy()),
        )
        .unwrap();

        let ctx = CommandContext::load(Some(&config_path)).unwrap();
        assert_eq!(ctx.database_path(), db_path.as_path());

        let store = ctx.store().unwrap();
        let user = store.create_user("a@example.com").unwrap();
        assert!(store.get_user(&user.id).unwrap().is_some());
        assert!(db_path.exists());
    }
}
