//! narrascope - Multi-Agent Narrative Analysis of CSV Datasets
//!
//! Answers a free-text question about a periodically updated CSV dataset by
//! fanning the same data out to differently prompted model agents and
//! merging their JSON replies into one typed result.
//!
//! ## Core Features
//!
//! - **Two-phase pipeline**: pattern and context agents in parallel, then synthesis
//! - **Single-phase pipeline**: one schema-constrained call
//! - **Defensive parsing**: fenced, prose-wrapped and truncated replies
//! - **Partial-result fallback**: a displayable result when the final reply is unparseable
//! - **Accounts and quotas**: per-day user limits, guest limits, history, email delivery
//!
//! ## Quick Start
//!
//! ```ignore
//! use narrascope::{AnalysisPipeline, ConfigLoader};
//!
//! let config = ConfigLoader::load()?;
//! let pipeline = AnalysisPipeline::from_config(&config)?;
//! let result = pipeline.analyze(&csv_text, "How is trade policy covered?").await?;
//! println!("{}", result.overall_summary);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: LLM provider abstraction, timeouts, response normalization
//! - [`analysis`]: Agent prompts, caller, merge and fallback
//! - [`dataset`]: CSV source
//! - [`storage`]: SQLite accounts, quotas and history
//! - [`notify`]: Email delivery of results
//! - [`service`]: End-to-end query flow
//! - [`config`]: Layered configuration

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod notify;
pub mod service;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, PipelineShape};

// Error Types
pub use types::error::{NarraError, Result, ResultExt};

// Data model
pub use types::{AgentRole, AnalysisResult, NotableQuote, Trend};

// Storage
pub use storage::{AccountStore, Database, PoolConfig, SharedDatabase, SqliteAccountStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use analysis::{AgentCaller, AnalysisPipeline, FallbackPolicy};
pub use dataset::{DatasetSource, HttpDatasetSource};
pub use notify::{EmailReceipt, EmailSender, HttpEmailSender, LogEmailSender};
pub use service::{QueryOutcome, QueryService, Requester};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    GeminiProvider, GenerationRequest, LlmProvider, LlmResponse, OpenAiProvider,
    ResponseNormalizer, SharedProvider, create_provider, with_timeout,
};
