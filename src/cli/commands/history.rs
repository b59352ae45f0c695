//! History Command
//!
//! List a user's saved analyses, newest first.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_json};
use crate::types::{NarraError, Result};

pub fn run(config_path: Option<&Path>, user_id: &str, format: OutputFormat) -> Result<()> {
    let store = CommandContext::load(config_path)?.store()?;
    if store.get_user(user_id)?.is_none() {
        return Err(NarraError::NotFound(format!("user {}", user_id)));
    }

    let analyses = store.get_user_analyses(user_id)?;
    match format {
        OutputFormat::Json => print_json(&analyses),
        OutputFormat::Text => {
            let output = Output::new();
            output.header(&format!("History ({} analyses)", analyses.len()));
            output.history(&analyses);
            Ok(())
        }
    }
}
