//! User Command
//!
//! Manage local accounts.
//!
//! Usage:
//!   narrascope user create <EMAIL>
//!   narrascope user show <ID> [--format json]
//!   narrascope user upgrade <ID>

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_json};
use crate::types::{NarraError, Result};

pub fn create(config_path: Option<&Path>, email: &str, format: OutputFormat) -> Result<()> {
    let store = CommandContext::load(config_path)?.store()?;
    let user = store.create_user(email)?;

    match format {
        OutputFormat::Json => print_json(&user),
        OutputFormat::Text => {
            Output::new().success(&format!("Created user {}", user.id));
            Ok(())
        }
    }
}

pub fn show(config_path: Option<&Path>, user_id: &str, format: OutputFormat) -> Result<()> {
    let store = CommandContext::load(config_path)?.store()?;
    let user = store
        .get_user(user_id)?
        .ok_or_else(|| NarraError::NotFound(format!("user {}", user_id)))?;

    match format {
        OutputFormat::Json => print_json(&user),
        OutputFormat::Text => {
            Output::new().user(&user);
            Ok(())
        }
    }
}

/// Flip the subscriber flag; payment happens elsewhere
pub fn upgrade(config_path: Option<&Path>, user_id: &str) -> Result<()> {
    let store = CommandContext::load(config_path)?.store()?;
    store.upgrade_to_subscriber(user_id)?;
    Output::new().success(&format!("User {} now has unlimited access", user_id));
    Ok(())
}
