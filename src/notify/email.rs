//! Email senders
//!
//! `HttpEmailSender` talks to a transactional email API
//! (`POST {api_base}/emails`, bearer key). `LogEmailSender` only logs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{EmailReceipt, EmailSender, render};
use crate::config::EmailConfig;
use crate::constants::network;
use crate::types::{AnalysisResult, ErrorClassifier, NarraError, Result};

const SERVICE: &str = "email";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
    text: String,
}

pub struct HttpEmailSender {
    client: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    from: String,
}

impl std::fmt::Debug for HttpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailSender")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .finish()
    }
}

impl HttpEmailSender {
    pub fn new(
        api_base: impl Into<String>,
        api_key: SecretString,
        from: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::EMAIL_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| NarraError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            from: from.into(),
        })
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .ok_or_else(|| {
                NarraError::ConfigurationMissing(format!(
                    "email API key (set email.api_key or {})",
                    config.api_key_env
                ))
            })?;

        if key.trim().is_empty() {
            return Err(NarraError::InvalidCredentials(
                "email API key is blank".to_string(),
            ));
        }

        Self::new(&config.api_base, SecretString::from(key), &config.from)
    }

    fn endpoint_url(&self) -> String {
        format!("{}/emails", self.api_base)
    }

    async fn send(&self, to: &str, query: &str, result: &AnalysisResult) -> Result<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject: render::subject(query),
            html: render::html_body(query, result),
            text: render::text_body(query, result),
        };

        debug!("Sending analysis email to {}", to);

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &text,
                SERVICE,
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_analysis_email(
        &self,
        to: &str,
        query: &str,
        result: &AnalysisResult,
    ) -> EmailReceipt {
        match self.send(to, query, result).await {
            Ok(()) => {
                info!("Analysis email sent to {}", to);
                EmailReceipt::sent()
            }
            Err(e) => EmailReceipt::failed(NarraError::Email(e.to_string())),
        }
    }
}

/// Logs instead of sending; used while email is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_analysis_email(
        &self,
        to: &str,
        query: &str,
        result: &AnalysisResult,
    ) -> EmailReceipt {
        info!(
            "Email delivery disabled; would send \"{}\" to {} ({} themes)",
            render::subject(query),
            to,
            result.key_themes.len()
        );
        EmailReceipt::sent()
    }
}
