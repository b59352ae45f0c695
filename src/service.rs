//! Query service
//!
//! One end-user query, start to finish:
//!
//! 1. Quota gate: one query is reserved against the user or guest (the
//!    pipeline is never invoked on rejection)
//! 2. Dataset fetch
//! 3. Analysis
//! 4. Usage kept on success, the reservation released on failure
//! 5. Signed-in users: history save; subscribers: email delivery
//!
//! Steps 1-3 are fatal on error. Step 5 failures are logged and reported in
//! the outcome without invalidating the result.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::AnalysisPipeline;
use crate::config::{Config, QuotaConfig};
use crate::dataset::{HttpDatasetSource, SharedDatasetSource};
use crate::notify::{EmailReceipt, SharedEmailSender, create_sender};
use crate::storage::{AccountStore, Database, SqliteAccountStore};
use crate::types::{AnalysisResult, NarraError, Result};

const DAILY_LIMIT_MESSAGE: &str =
    "You've reached your daily query limit. Please upgrade to unlimited access.";
const GUEST_LIMIT_MESSAGE: &str =
    "You've used all your free queries. Sign up to get unlimited access.";

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Guest { guest_id: String },
    User { user_id: String },
}

impl Requester {
    pub fn guest(id: impl Into<String>) -> Self {
        Self::Guest {
            guest_id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User { user_id: id.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub result: AnalysisResult,
    /// Set when the result was stored in the user's history
    pub saved_analysis_id: Option<String>,
    /// Set when delivery was attempted (subscribers only)
    pub email: Option<EmailReceipt>,
}

pub struct QueryService {
    pipeline: AnalysisPipeline,
    dataset: SharedDatasetSource,
    store: Arc<dyn AccountStore>,
    email: SharedEmailSender,
    quota: QuotaConfig,
}

impl QueryService {
    pub fn new(
        pipeline: AnalysisPipeline,
        dataset: SharedDatasetSource,
        store: Arc<dyn AccountStore>,
        email: SharedEmailSender,
        quota: QuotaConfig,
    ) -> Self {
        Self {
            pipeline,
            dataset,
            store,
            email,
            quota,
        }
    }

    /// Wire every collaborator from configuration.
    ///
    /// The provider is built first, so a missing API key fails here before
    /// the dataset or the database is touched.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = AnalysisPipeline::from_config(config)?;
        let dataset: SharedDatasetSource =
            Arc::new(HttpDatasetSource::from_config(&config.dataset)?);
        let db = Arc::new(Database::open(&config.storage.database)?);
        let store: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(db));
        let email = create_sender(&config.email)?;

        Ok(Self::new(
            pipeline,
            dataset,
            store,
            email,
            config.quota.clone(),
        ))
    }

    /// Build with injected collaborators and a provider from `config`.
    pub fn with_collaborators(
        config: &Config,
        dataset: SharedDatasetSource,
        store: Arc<dyn AccountStore>,
        email: SharedEmailSender,
    ) -> Result<Self> {
        let pipeline = AnalysisPipeline::from_config(config)?;
        Ok(Self::new(
            pipeline,
            dataset,
            store,
            email,
            config.quota.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub async fn run(&self, requester: &Requester, query: &str) -> Result<QueryOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NarraError::Config("Query must not be empty".to_string()));
        }

        let today = Utc::now().date_naive();
        self.reserve_query(requester, today)?;

        let result = match self.fetch_and_analyze(query).await {
            Ok(result) => result,
            Err(e) => {
                self.release_query(requester, today);
                return Err(e);
            }
        };

        let mut outcome = QueryOutcome {
            result,
            saved_analysis_id: None,
            email: None,
        };

        if let Requester::User { user_id } = requester {
            self.deliver(user_id, query, &mut outcome).await;
        }

        Ok(outcome)
    }

    async fn fetch_and_analyze(&self, query: &str) -> Result<AnalysisResult> {
        info!("Fetching dataset from {}", self.dataset.describe());
        let dataset = self.dataset.fetch().await?;
        self.pipeline.analyze(&dataset, query).await
    }

    fn reserve_query(&self, requester: &Requester, today: NaiveDate) -> Result<()> {
        match requester {
            Requester::User { user_id } => {
                if !self
                    .store
                    .try_reserve_query_on(user_id, self.quota.daily_limit, today)?
                {
                    info!("User {} is over the daily limit", user_id);
                    return Err(NarraError::QuotaExceeded(DAILY_LIMIT_MESSAGE.to_string()));
                }
            }
            Requester::Guest { guest_id } => {
                if !self
                    .store
                    .try_reserve_guest_query(guest_id, self.quota.guest_limit)?
                {
                    info!("Guest {} has used all free queries", guest_id);
                    return Err(NarraError::QuotaExceeded(GUEST_LIMIT_MESSAGE.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Failed queries do not count
    fn release_query(&self, requester: &Requester, today: NaiveDate) {
        let released = match requester {
            Requester::User { user_id } => self.store.release_query_on(user_id, today),
            Requester::Guest { guest_id } => self.store.release_guest_query(guest_id),
        };
        if let Err(e) = released {
            warn!("Failed to release query reservation: {}", e);
        }
    }

    async fn deliver(&self, user_id: &str, query: &str, outcome: &mut QueryOutcome) {
        match self.store.save_analysis(user_id, query, &outcome.result) {
            Ok(saved) => outcome.saved_analysis_id = Some(saved.id),
            Err(e) => warn!("Failed to save analysis for user {}: {}", user_id, e),
        }

        let user = match self.store.get_user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to load user {} for email delivery: {}", user_id, e);
                return;
            }
        };

        if user.is_subscriber {
            let receipt = self
                .email
                .send_analysis_email(&user.email, query, &outcome.result)
                .await;
            if let Some(err) = &receipt.error {
                warn!("Analysis email to {} not delivered: {}", user.email, err);
            }
            outcome.email = Some(receipt);
        }
    }
}
