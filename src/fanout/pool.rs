//! Worker pool draining a shared cursor.
//!
//! Every worker claims the next index with an atomic fetch-add, so no item
//! is claimed twice. Each claimed item owns exactly one slot in the shared
//! result store; the store lock is never held across an `.await`.

use super::fetcher::fetch_with_timeout;
use super::{FetchError, Outcome, WorkItem};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

/// Outcomes written so far plus the terminal flag.
struct Slots<V> {
    outcomes: HashMap<String, Outcome<V>>,
    frozen: bool,
}

/// State shared by the workers of one run.
pub(crate) struct SharedState<P, V> {
    items: Vec<WorkItem<P>>,
    cursor: AtomicUsize,
    slots: Mutex<Slots<V>>,
    progress: Option<ProgressBar>,
}

impl<P, V> SharedState<P, V> {
    pub(crate) fn new(items: Vec<WorkItem<P>>, progress: Option<ProgressBar>) -> Self {
        let capacity = items.len();
        Self {
            items,
            cursor: AtomicUsize::new(0),
            slots: Mutex::new(Slots {
                outcomes: HashMap::with_capacity(capacity),
                frozen: false,
            }),
            progress,
        }
    }

    pub(crate) fn items(&self) -> &[WorkItem<P>] {
        &self.items
    }

    /// Claim the next unclaimed item, if any remain.
    fn claim(&self) -> Option<&WorkItem<P>> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.items.get(index)
    }

    /// Number of items handed out to workers so far.
    pub(crate) fn claimed(&self) -> usize {
        self.cursor.load(Ordering::SeqCst).min(self.items.len())
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        // A poisoned lock only means another worker panicked mid-write;
        // the map itself is still consistent.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the outcome for `id`. Returns false when the run has already
    /// been frozen and the write was discarded.
    fn record(&self, id: &str, outcome: Outcome<V>) -> bool {
        let mut slots = self.lock();
        if slots.frozen {
            return false;
        }
        slots.outcomes.insert(id.to_string(), outcome);
        drop(slots);

        if let Some(ref pb) = self.progress {
            pb.inc(1);
        }
        true
    }

    /// Freeze the store and take everything written so far.
    ///
    /// After this call every `record` is a no-op.
    pub(crate) fn freeze(&self) -> HashMap<String, Outcome<V>> {
        let mut slots = self.lock();
        slots.frozen = true;
        std::mem::take(&mut slots.outcomes)
    }
}

/// One logical worker: claim, fetch, record, repeat until the cursor runs dry.
pub(crate) async fn run_worker<P, V, F, Fut>(
    worker: usize,
    state: Arc<SharedState<P, V>>,
    fetch: Arc<F>,
    per_item_timeout: Duration,
) -> usize
where
    P: Clone,
    F: Fn(WorkItem<P>) -> Fut,
    Fut: Future<Output = Result<V, FetchError>>,
{
    let mut handled = 0;

    while let Some(item) = state.claim() {
        trace!(worker, item = %item.id, "Claimed item");
        let outcome = fetch_with_timeout(item, fetch.as_ref(), per_item_timeout).await;

        if !state.record(&item.id, outcome) {
            debug!(worker, item = %item.id, "Discarded late outcome after freeze");
            break;
        }
        handled += 1;
    }

    trace!(worker, handled, "Worker finished");
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FailureReason;

    fn state(ids: &[&str]) -> SharedState<(), u32> {
        SharedState::new(ids.iter().map(|id| WorkItem::new(*id, ())).collect(), None)
    }

    #[test]
    fn test_claim_hands_out_each_item_once() {
        let state = state(&["AL", "FR", "US"]);
        let claimed: Vec<_> = std::iter::from_fn(|| state.claim().map(|i| i.id.clone())).collect();
        assert_eq!(claimed, vec!["AL", "FR", "US"]);
        assert!(state.claim().is_none());
        assert_eq!(state.claimed(), 3);
    }

    #[test]
    fn test_record_after_freeze_is_discarded() {
        let state = state(&["AL", "FR"]);
        assert!(state.record("AL", Outcome::success(5)));

        let frozen = state.freeze();
        assert_eq!(frozen.len(), 1);

        assert!(!state.record("FR", Outcome::failure(FailureReason::Timeout)));
        assert!(state.freeze().is_empty());
    }

    #[tokio::test]
    async fn test_single_worker_drains_everything() {
        let state = Arc::new(state(&["AL", "FR", "US"]));
        let fetch = Arc::new(|item: WorkItem<()>| async move { Ok(item.id.len() as u32) });

        let handled = run_worker(0, state.clone(), fetch, Duration::from_millis(50)).await;

        assert_eq!(handled, 3);
        let outcomes = state.freeze();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.values().all(Outcome::is_success));
    }
}
