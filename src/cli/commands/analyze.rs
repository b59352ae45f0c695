//! Analyze Command
//!
//! Run one narrative analysis against the configured dataset.
//!
//! Usage:
//!   narrascope analyze "<QUERY>" [--user ID | --guest ID] [--format json]
//!                      [--shape single-phase] [--provider openai] [--model M]

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, OutputFormat, print_json};
use crate::config::{Config, PipelineShape};
use crate::service::{QueryService, Requester};
use crate::types::Result;

/// Guest id used when neither `--user` nor `--guest` is given
pub const LOCAL_GUEST_ID: &str = "local";

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub query: String,
    pub user: Option<String>,
    pub guest: Option<String>,
    pub format: OutputFormat,
    pub shape: Option<PipelineShape>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl AnalyzeOptions {
    fn requester(&self) -> Requester {
        match (&self.user, &self.guest) {
            (Some(user_id), _) => Requester::user(user_id),
            (None, Some(guest_id)) => Requester::guest(guest_id),
            (None, None) => Requester::guest(LOCAL_GUEST_ID),
        }
    }

    /// Apply command-line overrides. Switching provider drops the configured
    /// model and key variable, which belong to the previous provider.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(shape) = self.shape {
            config.pipeline.shape = shape;
        }
        if let Some(provider) = &self.provider
            && !provider.eq_ignore_ascii_case(&config.llm.provider)
        {
            config.llm.provider = provider.clone();
            config.llm.model = None;
            config.llm.api_key_env = None;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
    }
}

pub async fn run(options: AnalyzeOptions) -> Result<()> {
    let mut ctx = CommandContext::load(options.config_path.as_deref())?;

    options.apply_overrides(&mut ctx.config);
    ctx.config.validate()?;

    let service = QueryService::from_config(&ctx.config)?;
    let requester = options.requester();
    let outcome = service.run(&requester, &options.query).await?;

    match options.format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => {
            let output = Output::new();
            output.analysis(&options.query, &outcome.result);
            println!();

            if let Some(id) = &outcome.saved_analysis_id {
                output.info(&format!("Saved to history as {}", id));
            }
            if let Some(receipt) = &outcome.email {
                if receipt.success {
                    output.success("Results sent by email");
                } else {
                    output.warning(&format!(
                        "Email delivery failed: {}",
                        receipt.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(user: Option<&str>, guest: Option<&str>) -> AnalyzeOptions {
        AnalyzeOptions {
            query: "tariffs".to_string(),
            user: user.map(String::from),
            guest: guest.map(String::from),
            format: OutputFormat::Text,
            shape: None,
            provider: None,
            model: None,
            config_path: None,
        }
    }

    #[test]
    fn test_requester_selection() {
        assert_eq!(options(Some("u1"), None).requester(), Requester::user("u1"));
        assert_eq!(options(None, Some("g1")).requester(), Requester::guest("g1"));
        assert_eq!(
            options(None, None).requester(),
            Requester::guest(LOCAL_GUEST_ID)
        );
    }

    #[test]
    fn test_provider_switch_drops_previous_model_and_key_env() {
        let mut config = Config::default();
        config.llm.model = Some("gemini-2.5-pro".to_string());
        config.llm.api_key_env = Some("MY_GEMINI_KEY".to_string());

        let mut opts = options(None, None);
        opts.provider = Some("openai".to_string());
        opts.apply_overrides(&mut config);

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, None);
        assert_eq!(config.llm.api_key_env, None);
    }

    #[test]
    fn test_model_override_applies_after_provider_switch() {
        let mut config = Config::default();
        let mut opts = options(None, None);
        opts.provider = Some("openai".to_string());
        opts.model = Some("gpt-4o".to_string());
        opts.shape = Some(PipelineShape::SinglePhase);
        opts.apply_overrides(&mut config);

        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.pipeline.shape, PipelineShape::SinglePhase);
    }

    #[test]
    fn test_same_provider_keeps_configured_model() {
        let mut config = Config::default();
        config.llm.model = Some("gemini-2.5-pro".to_string());

        let mut opts = options(None, None);
        opts.provider = Some("gemini".to_string());
        opts.apply_overrides(&mut config);

        assert_eq!(config.llm.model.as_deref(), Some("gemini-2.5-pro"));
    }
}
