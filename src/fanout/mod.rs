//! Bounded-concurrency fan-out over independent work items.
//!
//! A run takes a set of uniquely identified [`WorkItem`]s and an async
//! fetch function, drains the items through a fixed pool of workers with a
//! per-item timeout, caps the whole run with an overall deadline, and always
//! hands back a complete [`AggregateResult`]: one [`Outcome`] per item.

pub mod driver;
pub mod fetcher;
pub mod pool;

pub use driver::Aggregator;
pub use fetcher::FetchError;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One unit of fan-out work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<P> {
    /// Identity of the item, unique within one run (e.g. an ISO2 code).
    pub id: String,
    /// Whatever the fetcher needs besides the identity.
    pub params: P,
}

impl<P> WorkItem<P> {
    pub fn new(id: impl Into<String>, params: P) -> Self {
        Self {
            id: id.into(),
            params,
        }
    }
}

/// A list of work items whose identities are known to be unique.
#[derive(Debug, Clone)]
pub struct WorkItems<P> {
    items: Vec<WorkItem<P>>,
}

impl<P> WorkItems<P> {
    /// Build the list, rejecting the first repeated identity.
    pub fn try_new(items: Vec<WorkItem<P>>) -> Result<Self, AggregateError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(AggregateError::DuplicateItem(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn into_vec(self) -> Vec<WorkItem<P>> {
        self.items
    }
}

impl WorkItems<()> {
    /// Convenience for items that carry nothing but their identity.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, AggregateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_new(ids.into_iter().map(|id| WorkItem::new(id, ())).collect())
    }
}

/// Why an item produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureReason {
    /// The item's own timeout fired, or the overall deadline cut it off.
    Timeout,
    /// The provider answered with a non-success status.
    UpstreamError { status: u16 },
    /// Transport failure or an unparseable body.
    NetworkError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::UpstreamError { status } => write!(f, "upstream error {}", status),
            FailureReason::NetworkError => write!(f, "network error"),
        }
    }
}

/// Per-item result. Errors are data at this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome<V> {
    Success { value: V },
    Failure { reason: FailureReason },
}

impl<V> Outcome<V> {
    pub fn success(value: V) -> Self {
        Outcome::Success { value }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Outcome::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&V> {
        match self {
            Outcome::Success { value } => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason } => Some(*reason),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Completion {
    /// Every worker ran out of items before the deadline.
    Drained,
    /// The overall deadline fired first.
    DeadlineHit,
}

/// Run metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub attempted: usize,
    pub succeeded: usize,
    pub elapsed_ms: u64,
}

/// Frozen result of one run: exactly one outcome per submitted identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult<V> {
    pub outcomes: BTreeMap<String, Outcome<V>>,
    pub metrics: AggregateMetrics,
    pub completion: Completion,
}

impl<V> AggregateResult<V> {
    pub fn get(&self, id: &str) -> Option<&Outcome<V>> {
        self.outcomes.get(id)
    }

    /// Iterate over the identities that succeeded, with their values.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &V)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.value().map(|v| (id.as_str(), v)))
    }

    pub fn failed(&self) -> usize {
        self.metrics.attempted - self.metrics.succeeded
    }

    pub fn is_partial(&self) -> bool {
        self.metrics.succeeded < self.metrics.attempted
    }
}

/// Knobs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateConfig {
    /// Number of concurrent workers (C).
    pub concurrency: usize,
    /// Budget for a single item (T_item).
    pub per_item_timeout: Duration,
    /// Budget for the whole run (T_total).
    pub overall_timeout: Duration,
}

impl AggregateConfig {
    pub fn from_millis(concurrency: usize, per_item_timeout_ms: u64, overall_timeout_ms: u64) -> Self {
        Self {
            concurrency,
            per_item_timeout: Duration::from_millis(per_item_timeout_ms),
            overall_timeout: Duration::from_millis(overall_timeout_ms),
        }
    }

    /// Check the knobs before a run starts.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.concurrency == 0 {
            return Err(AggregateError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.per_item_timeout.is_zero() || self.overall_timeout.is_zero() {
            return Err(AggregateError::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }
        if self.overall_timeout <= self.per_item_timeout {
            return Err(AggregateError::InvalidConfig(format!(
                "overall timeout ({}ms) must exceed the per-item timeout ({}ms)",
                self.overall_timeout.as_millis(),
                self.per_item_timeout.as_millis()
            )));
        }
        Ok(())
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self::from_millis(6, 8_000, 25_000)
    }
}

/// Errors raised before a run starts. A started run never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("duplicate work item identity: {0}")]
    DuplicateItem(String),

    #[error("invalid aggregator configuration: {0}")]
    InvalidConfig(String),
}
