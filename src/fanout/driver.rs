//! Aggregator driver: overall deadline and result assembly.
//!
//! Lifecycle of one run: `Idle -> Running -> {Drained | DeadlineHit} -> Returned`.
//! The shared store is frozen exactly once, at the transition to `Returned`,
//! so the deadline path and the drain path can never both produce a result.

use super::pool::{run_worker, SharedState};
use super::{
    AggregateConfig, AggregateMetrics, AggregateResult, Completion, FailureReason, FetchError,
    Outcome, WorkItem, WorkItems,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs bounded-concurrency fan-outs with a fixed configuration.
#[derive(Clone)]
pub struct Aggregator {
    config: AggregateConfig,
    progress: Option<ProgressBar>,
    label: String,
}

impl Aggregator {
    pub fn new(config: AggregateConfig) -> Self {
        Self {
            config,
            progress: None,
            label: "fan-out".to_string(),
        }
    }

    /// Name used in log lines and on the progress bar.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Show a progress bar advanced once per recorded outcome.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.progress = if show {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };
        self
    }

    /// Fan `fetch` out over `items` and return the frozen result.
    ///
    /// Never fails: items that errored carry a `Failure` outcome, and items
    /// that had not finished when the overall deadline fired are recorded
    /// as `Failure(Timeout)`.
    pub async fn run<P, V, F, Fut>(&self, items: WorkItems<P>, fetch: F) -> AggregateResult<V>
    where
        P: Clone + Send + Sync + 'static,
        V: Send + 'static,
        F: Fn(WorkItem<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let started = Instant::now();
        let attempted = items.len();
        let concurrency = self.config.concurrency.max(1).min(attempted.max(1));

        info!(
            label = %self.label,
            items = attempted,
            concurrency,
            per_item_timeout_ms = self.config.per_item_timeout.as_millis() as u64,
            overall_timeout_ms = self.config.overall_timeout.as_millis() as u64,
            "Starting fan-out"
        );

        if let Some(ref pb) = self.progress {
            pb.set_length(attempted as u64);
            pb.set_position(0);
            pb.set_message(self.label.clone());
        }

        let state = Arc::new(SharedState::new(items.into_vec(), self.progress.clone()));
        let fetch = Arc::new(fetch);

        let mut workers = JoinSet::new();
        for worker in 0..concurrency {
            workers.spawn(run_worker(
                worker,
                state.clone(),
                fetch.clone(),
                self.config.per_item_timeout,
            ));
        }

        let drained = tokio::time::timeout(self.config.overall_timeout, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!(label = %self.label, error = %e, "Worker task ended abnormally");
                }
            }
        })
        .await
        .is_ok();

        let completion = if drained {
            Completion::Drained
        } else {
            warn!(
                label = %self.label,
                claimed = state.claimed(),
                items = attempted,
                "Overall deadline reached, abandoning in-flight work"
            );
            Completion::DeadlineHit
        };

        // Freeze before aborting so nothing written after this point counts.
        let mut written = state.freeze();
        workers.abort_all();

        let mut outcomes = BTreeMap::new();
        for item in state.items() {
            let outcome = written
                .remove(&item.id)
                .unwrap_or_else(|| Outcome::failure(FailureReason::Timeout));
            outcomes.insert(item.id.clone(), outcome);
        }

        let succeeded = outcomes.values().filter(|o| o.is_success()).count();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Some(ref pb) = self.progress {
            pb.finish_and_clear();
        }

        info!(
            label = %self.label,
            attempted,
            succeeded,
            elapsed_ms,
            ?completion,
            "Fan-out finished"
        );
        let timed_out = outcomes
            .values()
            .filter(|o| o.reason() == Some(FailureReason::Timeout))
            .count();
        debug!(
            label = %self.label,
            failed = attempted - succeeded,
            timed_out,
            "Failures recorded as data"
        );

        AggregateResult {
            outcomes,
            metrics: AggregateMetrics {
                attempted,
                succeeded,
                elapsed_ms,
            },
            completion,
        }
    }
}
