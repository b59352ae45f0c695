//! Multi-agent analysis pipeline
//!
//! ## Shapes
//!
//! - **Two-phase** (default): pattern and context agents run concurrently,
//!   then synthesis runs over both partials. 3 model calls.
//! - **Single-phase**: one schema-constrained call. 1 model call.
//!
//! ## Failure policy
//!
//! Any pattern or context failure aborts with `AnalysisFailed` naming the
//! phase. A failed synthesis/unified *call* aborts the same way. Only an
//! unparseable final reply degrades, via [`fallback`].

pub mod caller;
pub mod fallback;
pub mod merge;
pub mod prompts;

pub use caller::{AgentCaller, DatasetCaps};
pub use fallback::FallbackPolicy;

use std::time::Duration;
use tracing::{info, warn};

use crate::ai::{ProviderConfig, ResponseNormalizer, SharedProvider, create_provider};
use crate::config::{Config, PipelineConfig, PipelineShape};
use crate::types::{AgentPartial, AgentRole, AnalysisResult, NarraError, Result};

pub struct AnalysisPipeline {
    caller: AgentCaller,
    shape: PipelineShape,
    fallback: FallbackPolicy,
}

impl AnalysisPipeline {
    /// Build the pipeline and its provider from configuration.
    ///
    /// Fails with `ConfigurationMissing` before any network call when no API
    /// key is available.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = create_provider(&ProviderConfig::from(&config.llm))?;
        Ok(Self::new(
            provider,
            &config.pipeline,
            Duration::from_secs(config.llm.timeout_secs),
        ))
    }

    pub fn new(provider: SharedProvider, config: &PipelineConfig, timeout: Duration) -> Self {
        Self {
            caller: AgentCaller::new(provider, timeout, DatasetCaps::from(config)),
            shape: config.shape,
            fallback: FallbackPolicy {
                extract_summary: config.fallback_extract_summary,
            },
        }
    }

    /// Analyze `dataset` for `user_query`.
    pub async fn analyze(&self, dataset: &str, user_query: &str) -> Result<AnalysisResult> {
        info!(
            "Starting {} analysis ({} dataset chars)",
            self.shape,
            dataset.chars().count()
        );

        let result = match self.shape {
            PipelineShape::TwoPhase => self.analyze_two_phase(dataset, user_query).await?,
            PipelineShape::SinglePhase => self.analyze_single_phase(dataset, user_query).await?,
        };

        info!(
            "Analysis complete: {} themes, {} trends, {} quotes",
            result.key_themes.len(),
            result.emerging_trends.len(),
            result.notable_quotes.len()
        );

        Ok(result)
    }

    async fn analyze_two_phase(&self, dataset: &str, user_query: &str) -> Result<AnalysisResult> {
        // Phase 1: pattern and context in parallel
        let (pattern, context) = tokio::join!(
            self.caller.call(AgentRole::Pattern, dataset, user_query),
            self.caller.call(AgentRole::Context, dataset, user_query),
        );

        let pattern = pattern.map_err(|e| phase_error(AgentRole::Pattern, e))?;
        let context = context.map_err(|e| phase_error(AgentRole::Context, e))?;

        info!("Phase 1 complete, running synthesis");

        // Phase 2: synthesis over both partials
        let prior = [pattern, context];
        let raw = self
            .caller
            .call_raw(AgentRole::Synthesis, dataset, user_query, &prior)
            .await
            .map_err(|e| phase_error(AgentRole::Synthesis, e))?;
        let [pattern, context] = prior;

        match ResponseNormalizer::parse(&raw) {
            Ok(value) => {
                let synthesis = AgentPartial::new(AgentRole::Synthesis, value);
                Ok(merge::merge(&pattern, &context, &synthesis))
            }
            Err(e) => {
                warn!("Synthesis reply unparseable, using fallback summary: {}", e);
                Ok(merge::merge_with_summary(
                    &pattern,
                    &context,
                    self.fallback.summary(&raw),
                ))
            }
        }
    }

    async fn analyze_single_phase(
        &self,
        dataset: &str,
        user_query: &str,
    ) -> Result<AnalysisResult> {
        let raw = self
            .caller
            .call_raw(AgentRole::Unified, dataset, user_query, &[])
            .await
            .map_err(|e| phase_error(AgentRole::Unified, e))?;

        match ResponseNormalizer::parse(&raw) {
            Ok(value) => Ok(AnalysisResult::from_value(&value)),
            Err(e) => {
                warn!("Unified reply unparseable, using fallback result: {}", e);
                Ok(self.fallback.partial_result(&raw))
            }
        }
    }
}

fn phase_error(role: AgentRole, err: NarraError) -> NarraError {
    warn!("{} phase failed: {}", role, err);
    NarraError::analysis_failed(role.name(), err)
}
