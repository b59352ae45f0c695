//! Agent Caller
//!
//! One role-specific model request: truncate the dataset to the role's cap,
//! build the prompt, issue exactly one bounded request, normalize the reply.

use std::time::Duration;
use tracing::debug;

use super::prompts::{self, PromptInput};
use crate::ai::{GenerationRequest, ResponseNormalizer, SharedProvider, with_timeout};
use crate::config::PipelineConfig;
use crate::types::{AgentPartial, AgentRole, Result, estimate_tokens, truncate_chars};

/// Per-role dataset character caps
#[derive(Debug, Clone, Copy)]
pub struct DatasetCaps {
    /// Pattern and context agents
    pub agent: usize,
    pub synthesis: usize,
    /// Single-phase prompt; `None` sends the whole dataset
    pub unified: Option<usize>,
}

impl DatasetCaps {
    pub fn for_role(&self, role: AgentRole) -> Option<usize> {
        match role {
            AgentRole::Pattern | AgentRole::Context => Some(self.agent),
            AgentRole::Synthesis => Some(self.synthesis),
            AgentRole::Unified => self.unified,
        }
    }
}

impl From<&PipelineConfig> for DatasetCaps {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            agent: config.agent_dataset_chars,
            synthesis: config.synthesis_dataset_chars,
            unified: config.unified_dataset_chars,
        }
    }
}

#[derive(Clone)]
pub struct AgentCaller {
    provider: SharedProvider,
    timeout: Duration,
    caps: DatasetCaps,
}

impl AgentCaller {
    pub fn new(provider: SharedProvider, timeout: Duration, caps: DatasetCaps) -> Self {
        Self {
            provider,
            timeout,
            caps,
        }
    }

    /// Front slice of the dataset sent for `role`
    pub fn dataset_slice<'a>(&self, role: AgentRole, dataset: &'a str) -> &'a str {
        match self.caps.for_role(role) {
            Some(cap) => truncate_chars(dataset, cap),
            None => dataset,
        }
    }

    pub fn build_request(
        &self,
        role: AgentRole,
        dataset: &str,
        user_query: &str,
        prior: &[AgentPartial],
    ) -> GenerationRequest {
        let input = PromptInput {
            dataset: self.dataset_slice(role, dataset),
            user_query,
            prior,
        };
        let request = GenerationRequest::new(
            prompts::system_instruction(role),
            prompts::build_prompt(role, input),
        );
        match prompts::response_schema(role) {
            Some(schema) => request.with_schema(schema),
            None => request,
        }
    }

    /// Issue the request and return the raw text, unparsed.
    pub async fn call_raw(
        &self,
        role: AgentRole,
        dataset: &str,
        user_query: &str,
        prior: &[AgentPartial],
    ) -> Result<String> {
        let request = self.build_request(role, dataset, user_query, prior);

        debug!(
            "Calling {} agent via {} (~{} prompt tokens)",
            role,
            self.provider.name(),
            estimate_tokens(&request.prompt)
        );

        let operation = format!("{} agent request", role);
        let response =
            with_timeout(self.timeout, self.provider.generate(&request), &operation).await?;

        debug!(
            "{} agent replied with {} chars in {}ms",
            role,
            response.text.len(),
            response.timing.total_ms
        );

        Ok(response.text)
    }

    /// Call `role` and parse its reply into a partial.
    pub async fn call(
        &self,
        role: AgentRole,
        dataset: &str,
        user_query: &str,
    ) -> Result<AgentPartial> {
        self.call_with_prior(role, dataset, user_query, &[]).await
    }

    pub async fn call_with_prior(
        &self,
        role: AgentRole,
        dataset: &str,
        user_query: &str,
        prior: &[AgentPartial],
    ) -> Result<AgentPartial> {
        let raw = self.call_raw(role, dataset, user_query, prior).await?;
        let value = ResponseNormalizer::parse(&raw)?;
        Ok(AgentPartial::new(role, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{LlmProvider, LlmResponse};
    use crate::types::NarraError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every request and replies with a fixed text
    struct RecordingProvider {
        reply: String,
        requests: Mutex<Vec<GenerationRequest>>,
        delay: Option<Duration>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(LlmResponse::text_only(self.reply.clone()))
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    fn caps() -> DatasetCaps {
        DatasetCaps::from(&PipelineConfig::default())
    }

    #[test]
    fn test_caps_per_role() {
        let caps = caps();
        assert_eq!(caps.for_role(AgentRole::Pattern), Some(8000));
        assert_eq!(caps.for_role(AgentRole::Context), Some(8000));
        assert_eq!(caps.for_role(AgentRole::Synthesis), Some(3000));
        assert_eq!(caps.for_role(AgentRole::Unified), None);
    }

    #[tokio::test]
    async fn test_dataset_truncated_to_role_cap() {
        let provider = Arc::new(RecordingProvider::new("{\"keyThemes\": []}"));
        let caller = AgentCaller::new(provider.clone(), Duration::from_secs(5), caps());
        let dataset = "é".repeat(10_000);

        caller.call(AgentRole::Pattern, &dataset, "q").await.unwrap();
        caller
            .call_with_prior(AgentRole::Synthesis, &dataset, "q", &[])
            .await
            .unwrap();
        caller.call(AgentRole::Unified, &dataset, "q").await.unwrap();

        let requests = provider.requests.lock().unwrap();
        let counts: Vec<usize> = requests
            .iter()
            .map(|r| r.prompt.matches('é').count())
            .collect();
        assert_eq!(counts, vec![8000, 3000, 10_000]);
        assert!(requests[0].response_schema.is_none());
        assert!(requests[2].response_schema.is_some());
    }

    #[tokio::test]
    async fn test_one_request_per_call() {
        let provider = Arc::new(RecordingProvider::new("```json\n{\"a\": 1}\n```"));
        let caller = AgentCaller::new(provider.clone(), Duration::from_secs(5), caps());

        let partial = caller.call(AgentRole::Context, "x,y", "why?").await.unwrap();
        assert_eq!(partial.role, AgentRole::Context);
        assert_eq!(partial.value["a"], 1);
        assert_eq!(provider.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_reported() {
        let provider = Arc::new(RecordingProvider::new("I cannot help with that."));
        let caller = AgentCaller::new(provider, Duration::from_secs(5), caps());

        let err = caller.call(AgentRole::Pattern, "x", "q").await.unwrap_err();
        match err {
            NarraError::MalformedResponse { preview, .. } => {
                assert_eq!(preview, "I cannot help with that.")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let provider = Arc::new(RecordingProvider {
            delay: Some(Duration::from_secs(2)),
            ..RecordingProvider::new("{}")
        });
        let caller = AgentCaller::new(provider, Duration::from_millis(20), caps());

        let err = caller.call_raw(AgentRole::Pattern, "x", "q", &[]).await.unwrap_err();
        assert!(matches!(err, NarraError::Timeout { .. }));
        assert!(err.to_string().contains("pattern agent request"));
    }
}
