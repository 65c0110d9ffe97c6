//! Per-scope batch state and the registry that hands it out.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;

/// Ids reserved for one scope and how far into them we are.
///
/// Invariant: `last_issued <= highest_available`. The batch is exhausted when
/// the two are equal, which includes the zeroed initial state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Batch {
    pub(crate) last_issued: i64,
    pub(crate) highest_available: i64,
}

impl Batch {
    /// Builds the batch that starts at `next` and spans `size` ids.
    ///
    /// Returns `None` if the batch, or the first id after it, does not fit in
    /// an `i64`.
    pub(crate) fn reserve(next: i64, size: i64) -> Option<Self> {
        let last_issued = next.checked_sub(1)?;
        let highest_available = last_issued.checked_add(size)?;
        highest_available.checked_add(1)?;
        Some(Self { last_issued, highest_available })
    }

    /// First id past this batch; the value persisted after reserving it.
    pub(crate) fn first_of_next(&self) -> i64 {
        self.highest_available + 1
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.last_issued == self.highest_available
    }

    /// Hands out the next id. Callers must check [`Batch::is_exhausted`] first.
    pub(crate) fn take_next(&mut self) -> i64 {
        debug_assert!(!self.is_exhausted());
        self.last_issued += 1;
        self.last_issued
    }
}

/// State of one scope. The mutex guards the batch and the refill.
#[derive(Debug, Default)]
pub(crate) struct ScopeState {
    pub(crate) batch: Mutex<Batch>,
}

/// Lazily populated map from scope name to its state.
///
/// The lock here only serializes creation. Allocation happens under each
/// scope's own mutex, so unrelated scopes never wait on each other.
#[derive(Debug, Default)]
pub(crate) struct ScopeRegistry {
    states: RwLock<HashMap<String, Arc<ScopeState>>>,
}

impl ScopeRegistry {
    /// Returns the canonical state for `scope`, creating it on first use.
    pub(crate) fn get_or_create(&self, scope: &str) -> Arc<ScopeState> {
        if let Some(state) = self.states.read().get(scope) {
            return Arc::clone(state);
        }

        let mut states = self.states.write();
        // Another caller may have won the race between the two locks.
        if let Some(state) = states.get(scope) {
            return Arc::clone(state);
        }
        debug!(scope, "creating scope state");
        let state = Arc::new(ScopeState::default());
        states.insert(scope.to_owned(), Arc::clone(&state));
        state
    }

    pub(crate) fn len(&self) -> usize {
        self.states.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_batch_is_exhausted() {
        assert!(Batch::default().is_exhausted());
    }

    #[test]
    fn reserve_spans_requested_size() {
        let mut batch = Batch::reserve(1, 3).unwrap();
        assert_eq!(batch.first_of_next(), 4);
        assert_eq!(batch.take_next(), 1);
        assert_eq!(batch.take_next(), 2);
        assert_eq!(batch.take_next(), 3);
        assert!(batch.is_exhausted());
    }

    #[test]
    fn reserve_rejects_overflow() {
        assert!(Batch::reserve(i64::MAX, 1).is_none());
        assert!(Batch::reserve(i64::MAX - 10, 100).is_none());
        assert!(Batch::reserve(i64::MIN, 1).is_none());
        assert!(Batch::reserve(i64::MAX - 10, 9).is_some());
    }

    #[test]
    fn registry_returns_same_instance_per_scope() {
        let registry = ScopeRegistry::default();
        let a = registry.get_or_create("orders");
        let b = registry.get_or_create("orders");
        let c = registry.get_or_create("invoices");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_first_callers_agree_on_one_state() {
        let registry = Arc::new(ScopeRegistry::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_create("shared"))
            })
            .collect();

        let states: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(states.iter().all(|s| Arc::ptr_eq(s, &states[0])));
        assert_eq!(registry.len(), 1);
    }
}
