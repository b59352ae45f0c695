//! Result delivery by email

pub mod email;
pub mod render;

pub use email::{HttpEmailSender, LogEmailSender};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::config::EmailConfig;
use crate::types::{AnalysisResult, NarraError, Result};

/// Outcome of one delivery attempt; delivery failures are data, not errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailReceipt {
    pub success: bool,
    pub error: Option<String>,
}

impl EmailReceipt {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: NarraError) -> Self {
        warn!("Email delivery failed: {}", err);
        Self {
            success: false,
            error: Some(err.to_string()),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_analysis_email(
        &self,
        to: &str,
        query: &str,
        result: &AnalysisResult,
    ) -> EmailReceipt;
}

pub type SharedEmailSender = Arc<dyn EmailSender + Send + Sync>;

/// HTTP sender when enabled, logging sender otherwise
pub fn create_sender(config: &EmailConfig) -> Result<SharedEmailSender> {
    if config.enabled {
        Ok(Arc::new(HttpEmailSender::from_config(config)?))
    } else {
        Ok(Arc::new(LogEmailSender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_uses_log_sender() {
        assert!(create_sender(&EmailConfig::default()).is_ok());
    }

    #[test]
    fn test_enabled_with_key_builds_http_sender() {
        let config = EmailConfig {
            enabled: true,
            api_key: Some("re_key".to_string()),
            from: "reports@example.com".to_string(),
            ..Default::default()
        };
        assert!(create_sender(&config).is_ok());
    }

    #[test]
    fn test_failed_receipt_keeps_message() {
        let receipt = EmailReceipt::failed(NarraError::Email("HTTP 500".to_string()));
        assert!(!receipt.success);
        assert_eq!(receipt.error.as_deref(), Some("Email error: HTTP 500"));
    }
}
