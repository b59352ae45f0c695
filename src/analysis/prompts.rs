//! Agent prompt templates
//!
//! Pure builders keyed by `AgentRole`. Each role has a fixed system
//! instruction, a user prompt template and a response schema.

use serde_json::{Value, json};

use crate::types::{AgentPartial, AgentRole};

/// Inputs interpolated into a role's prompt template
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// Dataset slice, already truncated to the role's cap
    pub dataset: &'a str,
    /// User question, embedded verbatim
    pub user_query: &'a str,
    /// Earlier partials (synthesis only)
    pub prior: &'a [AgentPartial],
}

pub fn system_instruction(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Pattern => {
            "You are a pattern-recognition analyst. You read tabular newsletter data and \
             identify recurring themes and emerging trends, citing the rows that support them. \
             You respond with a single JSON object and nothing else."
        }
        AgentRole::Context => {
            "You are a context and history analyst. You find the most telling quotes in \
             tabular newsletter data and explain the historical background that gives them \
             meaning. You respond with a single JSON object and nothing else."
        }
        AgentRole::Synthesis => {
            "You are a senior editor who synthesizes the findings of other analysts into one \
             coherent narrative and draws connections across the data. You respond with a \
             single JSON object and nothing else."
        }
        AgentRole::Unified => {
            "You are a narrative analyst for newsletter datasets. You summarize, find themes \
             and trends, pick notable quotes and connect the data into one structured answer."
        }
    }
}

pub fn build_prompt(role: AgentRole, input: PromptInput<'_>) -> String {
    match role {
        AgentRole::Pattern => pattern_prompt(input),
        AgentRole::Context => context_prompt(input),
        AgentRole::Synthesis => synthesis_prompt(input),
        AgentRole::Unified => unified_prompt(input),
    }
}

fn pattern_prompt(input: PromptInput<'_>) -> String {
    format!(
        r#"<OBJECTIVES>
Answer the user's question by finding patterns in the dataset:
1. List the key themes, most relevant first
2. Describe emerging trends with the data points that support them
</OBJECTIVES>

## User Question
{}

## Dataset (CSV)
{}

<FOCUS>
- ONLY report themes and trends visible in the rows above
- Quote row values in supportingData rather than paraphrasing them
</FOCUS>

Respond with JSON of this shape:
{{"keyThemes": ["..."], "emergingTrends": [{{"trend": "...", "description": "...", "supportingData": ["..."]}}]}}
"#,
        input.user_query, input.dataset
    )
}

fn context_prompt(input: PromptInput<'_>) -> String {
    format!(
        r#"<OBJECTIVES>
Answer the user's question by grounding it in the dataset's own words:
1. Select notable quotes and explain the context of each
2. Note historical insights that explain why these quotes matter
</OBJECTIVES>

## User Question
{}

## Dataset (CSV)
{}

<FOCUS>
- Quotes must appear in the dataset verbatim
- Keep each context to one or two sentences
</FOCUS>

Respond with JSON of this shape:
{{"notableQuotes": [{{"quote": "...", "context": "..."}}], "historicalInsights": ["..."]}}
"#,
        input.user_query, input.dataset
    )
}

fn synthesis_prompt(input: PromptInput<'_>) -> String {
    let mut findings = String::new();
    for partial in input.prior {
        let body = serde_json::to_string_pretty(&partial.value).unwrap_or_default();
        findings.push_str(&format!("### {} analyst\n{}\n\n", partial.role, body));
    }
    if findings.is_empty() {
        findings.push_str("(no prior findings)\n");
    }

    format!(
        r#"<OBJECTIVES>
Combine the analysts' findings into a final answer to the user's question:
1. Write an overall summary that answers the question directly
2. Explain the connections between themes, trends and quotes
</OBJECTIVES>

## User Question
{}

## Analyst Findings
{}
## Dataset Excerpt (CSV)
{}

Respond with JSON of this shape:
{{"overallSummary": "...", "dataConnections": "..."}}
"#,
        input.user_query, findings, input.dataset
    )
}

fn unified_prompt(input: PromptInput<'_>) -> String {
    format!(
        r#"Answer the user's question using the dataset below. Produce an overall summary,
key themes (most relevant first), emerging trends with supporting data, notable quotes
with context, and a paragraph on how the data points connect.

## User Question
{}

## Dataset (CSV)
{}
"#,
        input.user_query, input.dataset
    )
}

/// Endpoint-native response schema. Only the single-phase prompt is
/// schema-constrained; the two-phase roles describe their shape in the prompt.
pub fn response_schema(role: AgentRole) -> Option<Value> {
    match role {
        AgentRole::Unified => Some(json!({
            "type": "object",
            "required": [
                "overallSummary",
                "keyThemes",
                "emergingTrends",
                "notableQuotes",
                "dataConnections"
            ],
            "properties": {
                "overallSummary": {"type": "string"},
                "keyThemes": string_list("Themes ordered by relevance"),
                "emergingTrends": trend_list(),
                "notableQuotes": quote_list(),
                "dataConnections": {"type": "string"}
            }
        })),
        AgentRole::Pattern | AgentRole::Context | AgentRole::Synthesis => None,
    }
}

fn string_list(description: &str) -> Value {
    json!({"type": "array", "description": description, "items": {"type": "string"}})
}

fn trend_list() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["trend", "description"],
            "properties": {
                "trend": {"type": "string"},
                "description": {"type": "string"},
                "supportingData": {"type": "array", "items": {"type": "string"}}
            }
        }
    })
}

fn quote_list() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["quote", "context"],
            "properties": {
                "quote": {"type": "string"},
                "context": {"type": "string"}
            }
        }
    })
}
