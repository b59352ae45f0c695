//! AI Integration Layer
//!
//! Model endpoint providers, response normalization and call timeouts.

pub mod provider;
pub mod timeout;
pub mod validation;

pub use provider::{
    GeminiProvider, GenerationRequest, LlmProvider, LlmResponse, OpenAiProvider, ProviderConfig,
    ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;
pub use validation::ResponseNormalizer;
