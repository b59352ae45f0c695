//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Multi-agent pipeline constants
pub mod pipeline {
    /// Dataset characters sent to the pattern and context agents (front slice)
    pub const AGENT_DATASET_CHARS: usize = 8000;

    /// Dataset characters sent to the synthesis agent alongside prior partials
    pub const SYNTHESIS_DATASET_CHARS: usize = 3000;

    /// Characters of raw model text kept in a malformed-response error
    pub const RAW_PREVIEW_CHARS: usize = 500;

    /// Maximum length of an `overallSummary` salvaged by the fallback
    pub const FALLBACK_SUMMARY_MAX_CHARS: usize = 500;
}

/// Fallback text used when the final response cannot be parsed
pub mod fallback {
    pub const SUMMARY: &str = "The analysis completed, but the response was too complex or too long to parse fully. Try a narrower question for a complete breakdown.";

    pub const DATA_CONNECTIONS: &str = "The model most likely returned rich content that exceeded a parseable structure, so detailed connections could not be extracted from this run.";
}

/// Usage quota defaults
pub mod quota {
    /// Queries per UTC day for signed-in, non-subscriber users
    pub const DEFAULT_DAILY_LIMIT: u32 = 3;

    /// Lifetime queries for guests
    pub const DEFAULT_GUEST_LIMIT: u32 = 3;
}

/// HTTP/Network constants
pub mod network {
    /// Default model request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default dataset fetch timeout (seconds)
    pub const DATASET_TIMEOUT_SECS: u64 = 60;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Email dispatch timeout (seconds)
    pub const EMAIL_TIMEOUT_SECS: u64 = 30;
}

/// Storage constants
pub mod storage {
    /// Data directory (relative to the working directory)
    pub const DATA_DIR: &str = ".narrascope";

    /// Database file inside the data directory
    pub const DATABASE_FILE: &str = "narrascope.db";
}
