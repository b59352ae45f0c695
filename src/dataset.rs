//! Dataset source
//!
//! The analysis input is a CSV document fetched fresh for every query.
//! The text is passed through untouched; no CSV parsing happens here.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::config::DatasetConfig;
use crate::constants::network;
use crate::types::{ErrorClassifier, NarraError, Result};

const SERVICE: &str = "dataset";

#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the current dataset text.
    async fn fetch(&self) -> Result<String>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

pub type SharedDatasetSource = Arc<dyn DatasetSource + Send + Sync>;

/// One GET per fetch against a published CSV URL
#[derive(Debug)]
pub struct HttpDatasetSource {
    url: Url,
    client: reqwest::Client,
}

impl HttpDatasetSource {
    pub fn new(url: Option<&str>, timeout: Duration) -> Result<Self> {
        let raw = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                NarraError::ConfigurationMissing(
                    "dataset URL (set dataset.url or NARRASCOPE_DATASET_URL)".to_string(),
                )
            })?;

        let url = Url::parse(raw)
            .map_err(|e| NarraError::Config(format!("Invalid dataset URL '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(NarraError::Config(format!(
                "Dataset URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| NarraError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        Self::new(
            config.url.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    async fn fetch(&self) -> Result<String> {
        let start = Instant::now();
        debug!("Fetching dataset from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarraError::ServiceUnavailable {
                service: SERVICE.to_string(),
                status: Some(status.as_u16()),
                message: format!(
                    "Failed to fetch data from the source. Status: {}",
                    status.as_u16()
                ),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE))?;

        info!(
            "Fetched dataset: {} chars in {:?}",
            text.chars().count(),
            start.elapsed()
        );

        Ok(text)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::test_server::serve_once;
    use super::*;

    #[test]
    fn test_missing_url_is_configuration_missing() {
        for url in [None, Some(""), Some("   ")] {
            assert!(matches!(
                HttpDatasetSource::new(url, Duration::from_secs(1)),
                Err(NarraError::ConfigurationMissing(_))
            ));
        }
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        assert!(matches!(
            HttpDatasetSource::new(Some("not a url"), Duration::from_secs(1)),
            Err(NarraError::Config(_))
        ));
        assert!(matches!(
            HttpDatasetSource::new(Some("ftp://example.com/data.csv"), Duration::from_secs(1)),
            Err(NarraError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_returns_body_untouched() {
        let url = serve_once("200 OK", "date,headline\n2024-05-01,\"Rates, again\"\n").await;
        let source = HttpDatasetSource::new(Some(&url), Duration::from_secs(5)).unwrap();

        let text = source.fetch().await.unwrap();
        assert_eq!(text, "date,headline\n2024-05-01,\"Rates, again\"\n");
    }

    #[tokio::test]
    async fn test_fetch_404_reports_status() {
        let url = serve_once("404 Not Found", "").await;
        let source = HttpDatasetSource::new(Some(&url), Duration::from_secs(5)).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));
        assert!(err.user_message().contains("fetching data"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_service_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}/data.csv", address);
        let source = HttpDatasetSource::new(Some(&url), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(NarraError::ServiceUnavailable { .. })
        ));
    }
}
