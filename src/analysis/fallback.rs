//! Partial-result fallback
//!
//! Built when the final model reply cannot be parsed. Infallible: the result
//! carries fixed diagnostic text and empty lists. With `extract_summary` set,
//! a complete `"overallSummary": "..."` value found in the raw text replaces
//! the diagnostic summary.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::constants::{fallback, pipeline::FALLBACK_SUMMARY_MAX_CHARS};
use crate::types::{AnalysisResult, SynthesisPartial, truncate_chars};

/// Closed JSON string value of `overallSummary`; unterminated values do not match
static SUMMARY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""overallSummary"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("summary pattern is valid")
});

#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    pub extract_summary: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            extract_summary: true,
        }
    }
}

impl FallbackPolicy {
    /// Summary fields for an unparseable reply
    pub fn summary(&self, raw: &str) -> SynthesisPartial {
        let salvaged = if self.extract_summary {
            extract_summary(raw)
        } else {
            None
        };

        SynthesisPartial {
            overall_summary: salvaged.unwrap_or_else(|| fallback::SUMMARY.to_string()),
            data_connections: fallback::DATA_CONNECTIONS.to_string(),
        }
    }

    pub fn partial_result(&self, raw: &str) -> AnalysisResult {
        let summary = self.summary(raw);
        AnalysisResult {
            overall_summary: summary.overall_summary,
            data_connections: summary.data_connections,
            ..Default::default()
        }
    }
}

/// Fallback result under the default policy
pub fn partial_result(raw: &str) -> AnalysisResult {
    FallbackPolicy::default().partial_result(raw)
}

fn extract_summary(raw: &str) -> Option<String> {
    let captured = SUMMARY_FIELD.captures(raw)?.get(1)?.as_str();

    // Reuse the JSON string decoder for escapes
    let decoded: String = serde_json::from_str(&format!("\"{}\"", captured)).ok()?;
    let decoded = decoded.trim();
    if decoded.is_empty() {
        return None;
    }

    debug!("Salvaged overallSummary from unparseable reply");
    Some(truncate_chars(decoded, FALLBACK_SUMMARY_MAX_CHARS).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_diagnostic_result() {
        let result = partial_result("");
        assert_eq!(result.overall_summary, fallback::SUMMARY);
        assert_eq!(result.data_connections, fallback::DATA_CONNECTIONS);
        assert!(result.key_themes.is_empty());
        assert!(result.emerging_trends.is_empty());
        assert!(result.notable_quotes.is_empty());
    }

    #[test]
    fn test_truncated_summary_is_not_extracted() {
        let raw = "{\"overallSummary\": \"Rates climbed through the year while";
        assert_eq!(partial_result(raw).overall_summary, fallback::SUMMARY);
    }

    #[test]
    fn test_complete_summary_is_salvaged() {
        let raw = "{\"overallSummary\": \"Rates \\\"climbed\\\"\\nsteadily\", \"keyThemes\": [\"rates\", ";
        let result = partial_result(raw);
        assert_eq!(result.overall_summary, "Rates \"climbed\"\nsteadily");
        assert_eq!(result.data_connections, fallback::DATA_CONNECTIONS);
        assert!(result.key_themes.is_empty());
    }

    #[test]
    fn test_extraction_can_be_disabled() {
        let policy = FallbackPolicy {
            extract_summary: false,
        };
        let raw = "{\"overallSummary\": \"S\", \"keyThemes\": [";
        assert_eq!(policy.partial_result(raw).overall_summary, fallback::SUMMARY);
    }

    #[test]
    fn test_salvaged_summary_is_capped() {
        let raw = format!("{{\"overallSummary\": \"{}\", ", "ü".repeat(900));
        let summary = partial_result(&raw).overall_summary;
        assert_eq!(summary.chars().count(), FALLBACK_SUMMARY_MAX_CHARS);
    }

    #[test]
    fn test_blank_summary_uses_diagnostic() {
        assert_eq!(
            partial_result("{\"overallSummary\": \"   \", \"x\"").overall_summary,
            fallback::SUMMARY
        );
    }
}
