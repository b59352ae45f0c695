//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Error Kinds
//!
//! - **ConfigurationMissing**: No API key or dataset URL (fatal, no retry)
//! - **InvalidCredentials**: Key present but unusable or rejected by the endpoint
//! - **ServiceUnavailable**: Dataset or model endpoint returned non-success / network failure
//! - **MalformedResponse**: Model text could not be coerced into a JSON object
//! - **AnalysisFailed**: Aggregated pipeline failure naming the phase that failed
//! - **QuotaExceeded**: Caller-side gate, raised before the core is invoked
//!
//! No variant is retried automatically; every failure is terminal for the request.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum NarraError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    /// Required setting absent (API key, dataset URL)
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Setting present but out of range or unparseable
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    // -------------------------------------------------------------------------
    // Remote Service Errors
    // -------------------------------------------------------------------------
    #[error("{service} unavailable: {message}")]
    ServiceUnavailable {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed model response: {message}")]
    MalformedResponse { message: String, preview: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Analysis failed in {phase} phase: {source}")]
    AnalysisFailed {
        phase: String,
        #[source]
        source: Box<NarraError>,
    },

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Email error: {0}")]
    Email(String),
}

pub type Result<T> = std::result::Result<T, NarraError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl NarraError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a service error without an HTTP status (network-level failure)
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a malformed-response error, keeping a bounded preview of the raw text
    pub fn malformed(message: impl Into<String>, raw: &str, preview_chars: usize) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            preview: raw.chars().take(preview_chars).collect(),
        }
    }

    /// Wrap an error with the pipeline phase it occurred in
    pub fn analysis_failed(phase: impl Into<String>, source: NarraError) -> Self {
        Self::AnalysisFailed {
            phase: phase.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status attached to a service error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServiceUnavailable { status, .. } => *status,
            Self::AnalysisFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Name of the failed pipeline phase, if this is an aggregated analysis failure
    pub fn failed_phase(&self) -> Option<&str> {
        match self {
            Self::AnalysisFailed { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// Whether this error came from a caller-side gate rather than the pipeline
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }

    /// Single human-readable line for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::QuotaExceeded(msg) => msg.clone(),
            Self::ConfigurationMissing(what) => {
                format!("The service is not configured: {}.", what)
            }
            Self::InvalidCredentials(_) => {
                "The analysis service rejected its credentials. Please contact the operator."
                    .to_string()
            }
            Self::ServiceUnavailable {
                service, message, ..
            } if service == "dataset" => {
                format!("An error occurred while fetching data: {}", message)
            }
            Self::Timeout { operation, .. } => {
                format!("{} took too long. Please try again.", operation)
            }
            other => format!(
                "An error occurred during analysis: {}. Please try a different query.",
                other
            ),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps endpoint responses to error variants
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a non-success HTTP status from a remote service
    pub fn classify_http_status(status: u16, body: &str, service: &str) -> NarraError {
        let body = body.trim();
        let detail = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate_body(body))
        };

        match status {
            401 | 403 => NarraError::InvalidCredentials(format!("{} ({})", service, detail)),
            _ => NarraError::ServiceUnavailable {
                service: service.to_string(),
                status: Some(status),
                message: detail,
            },
        }
    }

    /// Classify a transport-level failure (DNS, connect, TLS, body read)
    pub fn classify_transport(err: &reqwest::Error, service: &str) -> NarraError {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        NarraError::ServiceUnavailable {
            service: service.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 300;
    if body.chars().count() > MAX_BODY_CHARS {
        let head: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| NarraError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| NarraError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
