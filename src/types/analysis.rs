//! Analysis data model
//!
//! `AnalysisResult` is the canonical merged output handed to callers.
//! JSON field names are camelCase so stored results and model prompts share
//! one wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::{json_string_array, json_string_or};

/// Canonical merged analysis output.
///
/// All five fields are always present. Strict deserialization requires every
/// field; lenient construction from model output goes through [`AnalysisResult::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_summary: String,
    /// Ordered by relevance as produced by the pattern agent
    pub key_themes: Vec<String>,
    pub emerging_trends: Vec<Trend>,
    pub notable_quotes: Vec<NotableQuote>,
    pub data_connections: String,
}

impl AnalysisResult {
    /// Build a result from an arbitrary model object, defaulting anything
    /// missing or mistyped to empty.
    pub fn from_value(value: &Value) -> Self {
        Self {
            overall_summary: json_string_or(value, "overallSummary", ""),
            key_themes: json_string_array(value, "keyThemes"),
            emerging_trends: Trend::list_from(value, "emergingTrends"),
            notable_quotes: NotableQuote::list_from(value, "notableQuotes"),
            data_connections: json_string_or(value, "dataConnections", ""),
        }
    }

    /// True when no section carries any content
    pub fn is_empty(&self) -> bool {
        self.overall_summary.is_empty()
            && self.key_themes.is_empty()
            && self.emerging_trends.is_empty()
            && self.notable_quotes.is_empty()
            && self.data_connections.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub trend: String,
    pub description: String,
    pub supporting_data: Vec<String>,
}

impl Trend {
    /// Lenient list extraction; entries without a `trend` name are dropped.
    pub fn list_from(value: &Value, key: &str) -> Vec<Trend> {
        value
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| {
                        Some(Trend {
                            trend: v.get("trend")?.as_str()?.to_string(),
                            description: json_string_or(v, "description", ""),
                            supporting_data: json_string_array(v, "supportingData"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotableQuote {
    pub quote: String,
    pub context: String,
}

impl NotableQuote {
    /// Lenient list extraction; entries without a `quote` are dropped.
    pub fn list_from(value: &Value, key: &str) -> Vec<NotableQuote> {
        value
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| {
                        Some(NotableQuote {
                            quote: v.get("quote")?.as_str()?.to_string(),
                            context: json_string_or(v, "context", ""),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Agent partials
// =============================================================================

/// Prompt role of one model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Themes and trends
    Pattern,
    /// Quotes and historical context
    Context,
    /// Summary and cross-data connections over the other two partials
    Synthesis,
    /// Single-phase prompt producing the whole result
    Unified,
}

impl AgentRole {
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Pattern => "pattern",
            AgentRole::Context => "context",
            AgentRole::Synthesis => "synthesis",
            AgentRole::Unified => "unified",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw parsed object returned by one agent call.
///
/// Lives only for one orchestration run; the typed views below read it leniently.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPartial {
    pub role: AgentRole,
    pub value: Value,
}

impl AgentPartial {
    pub fn new(role: AgentRole, value: Value) -> Self {
        Self { role, value }
    }

    pub fn pattern(&self) -> PatternPartial {
        PatternPartial {
            key_themes: json_string_array(&self.value, "keyThemes"),
            emerging_trends: Trend::list_from(&self.value, "emergingTrends"),
        }
    }

    pub fn context(&self) -> ContextPartial {
        ContextPartial {
            notable_quotes: NotableQuote::list_from(&self.value, "notableQuotes"),
            historical_insights: json_string_array(&self.value, "historicalInsights"),
        }
    }

    pub fn synthesis(&self) -> SynthesisPartial {
        SynthesisPartial {
            overall_summary: json_string_or(&self.value, "overallSummary", ""),
            data_connections: json_string_or(&self.value, "dataConnections", ""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternPartial {
    pub key_themes: Vec<String>,
    pub emerging_trends: Vec<Trend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPartial {
    pub notable_quotes: Vec<NotableQuote>,
    pub historical_insights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisPartial {
    pub overall_summary: String,
    pub data_connections: String,
}
