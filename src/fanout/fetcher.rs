//! Per-item fetch wrapper.
//!
//! Runs one caller-supplied upstream operation under the item's timeout and
//! folds every way it can go wrong into a [`FailureReason`].

use super::{FailureReason, Outcome, WorkItem};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of a single upstream operation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("upstream responded with status {status}")]
    Upstream { status: u16 },

    #[error("transport failure: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Classify the error the way the result map records it.
    pub fn reason(&self) -> FailureReason {
        match self {
            FetchError::Timeout => FailureReason::Timeout,
            FetchError::Upstream { status } => FailureReason::UpstreamError { status: *status },
            FetchError::Network(_) | FetchError::Malformed(_) => FailureReason::NetworkError,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Upstream {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Run `fetch` for one item, bounded by `timeout`.
///
/// The operation's future is dropped when the timeout fires, so a late
/// settlement is never observed. A panic inside the operation is recorded
/// as a network failure instead of taking the worker down.
pub async fn fetch_with_timeout<P, V, F, Fut>(
    item: &WorkItem<P>,
    fetch: &F,
    timeout: Duration,
) -> Outcome<V>
where
    P: Clone,
    F: Fn(WorkItem<P>) -> Fut,
    Fut: Future<Output = Result<V, FetchError>>,
{
    let operation = AssertUnwindSafe(fetch(item.clone())).catch_unwind();

    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(Ok(value))) => Outcome::success(value),
        Ok(Ok(Err(e))) => {
            let reason = e.reason();
            debug!(item = %item.id, %reason, error = %e, "Fetch failed");
            Outcome::failure(reason)
        }
        Ok(Err(_panic)) => {
            debug!(item = %item.id, "Fetch panicked");
            Outcome::failure(FailureReason::NetworkError)
        }
        Err(_elapsed) => {
            debug!(item = %item.id, timeout_ms = timeout.as_millis() as u64, "Fetch timed out");
            Outcome::failure(FailureReason::Timeout)
        }
    }
}
