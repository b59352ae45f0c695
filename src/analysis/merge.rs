//! Partial merge
//!
//! Field ownership: summary and connections come from synthesis, themes and
//! trends from pattern, quotes from context. Anything missing or mistyped
//! becomes empty, so the result always carries all five fields.

use crate::types::{AgentPartial, AnalysisResult, SynthesisPartial};

pub fn merge(
    pattern: &AgentPartial,
    context: &AgentPartial,
    synthesis: &AgentPartial,
) -> AnalysisResult {
    merge_with_summary(pattern, context, synthesis.synthesis())
}

/// Merge list sections from the partials with an externally supplied summary
/// (the fallback path when the synthesis reply could not be parsed).
pub fn merge_with_summary(
    pattern: &AgentPartial,
    context: &AgentPartial,
    summary: SynthesisPartial,
) -> AnalysisResult {
    let pattern = pattern.pattern();
    let context = context.context();

    AnalysisResult {
        overall_summary: summary.overall_summary,
        key_themes: pattern.key_themes,
        emerging_trends: pattern.emerging_trends,
        notable_quotes: context.notable_quotes,
        data_connections: summary.data_connections,
    }
}
