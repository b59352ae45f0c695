pub mod analysis;
pub mod error;
pub mod utils;

pub use analysis::{
    AgentPartial, AgentRole, AnalysisResult, ContextPartial, NotableQuote, PatternPartial,
    SynthesisPartial, Trend,
};
pub use error::{ErrorClassifier, NarraError, Result, ResultExt};
pub use utils::{estimate_tokens, json_string, json_string_array, json_string_or, truncate_chars};
