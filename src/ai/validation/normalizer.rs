//! Response Normalizer
//!
//! Coerces free-form model text into a JSON object.
//!
//! Two attempts, in order:
//! 1. Regex-extract the outermost `{...}` span from the raw text (fences left
//!    intact) and parse. Fences wrapping the object fall outside the span, and
//!    fence text inside string values is kept.
//! 2. [`ResponseNormalizer::normalize`]: strip every code-fence marker, slice
//!    first `{` .. last `}`, parse.
//!
//! No bracket balancing is done. Truncated output fails here and is handled
//! by the caller's fallback.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::constants::pipeline::RAW_PREVIEW_CHARS;
use crate::types::{NarraError, Result};

/// Fence marker with an optional language tag (```json, ```JSON, ```)
static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("fence pattern is valid"));

/// Greedy outermost object span
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object pattern is valid"));

/// Stateless text-to-JSON coercion
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Reduce raw text to the candidate JSON object text.
    ///
    /// Fails on empty input or when no `{`..`}` pair exists.
    pub fn normalize(raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NarraError::malformed(
                "empty model response",
                raw,
                RAW_PREVIEW_CHARS,
            ));
        }

        let stripped = FENCE_MARKER.replace_all(trimmed, "");

        match (stripped.find('{'), stripped.rfind('}')) {
            (Some(open), Some(close)) if close > open => {
                Ok(stripped[open..=close].trim().to_string())
            }
            _ => Err(NarraError::malformed(
                "no JSON object found in model response",
                raw,
                RAW_PREVIEW_CHARS,
            )),
        }
    }

    /// Parse raw model text into a JSON object.
    ///
    /// The error preview always holds the first characters of `raw`.
    pub fn parse(raw: &str) -> Result<Value> {
        if let Some(span) = OBJECT_SPAN.find(raw.trim()) {
            match Self::parse_object(span.as_str()) {
                Ok(value) => return Ok(value),
                Err(message) => {
                    debug!("Raw object span rejected ({}), stripping fences", message)
                }
            }
        }

        let message = match Self::normalize(raw) {
            Ok(candidate) => match Self::parse_object(&candidate) {
                Ok(value) => return Ok(value),
                Err(message) => message,
            },
            Err(NarraError::MalformedResponse { message, .. }) => message,
            Err(other) => other.to_string(),
        };

        Err(NarraError::malformed(message, raw, RAW_PREVIEW_CHARS))
    }

    fn parse_object(candidate: &str) -> std::result::Result<Value, String> {
        let value: Value =
            serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {}", e))?;

        if !value.is_object() {
            return Err("model response is not a JSON object".to_string());
        }

        Ok(value)
    }
}
