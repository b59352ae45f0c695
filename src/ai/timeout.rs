//! Timeout wrapper for outbound calls
//!
//! Every model request is bounded; expiry surfaces as `NarraError::Timeout`
//! and is never retried.
//!
//! ```ignore
//! let response = with_timeout(
//!     Duration::from_secs(300),
//!     provider.generate(&request),
//!     "pattern agent request",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{NarraError, Result};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(NarraError::timeout(operation_name, timeout)),
    }
}
