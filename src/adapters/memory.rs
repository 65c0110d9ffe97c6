//! In-memory counter store.
//!
//! A [`MemoryBackend`] plays the role of the shared durable medium; every
//! [`MemoryCounterStore`] handle over it behaves like an independent process
//! with its own view of what it last read.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ports::{CounterStore, StoreError, StoreFuture, SEED_VALUE};

#[derive(Debug, Clone)]
struct Record {
    value: String,
    version: u64,
}

/// Shared storage behind one or more [`MemoryCounterStore`] handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<HashMap<String, Record>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new store handle on this backend.
    #[must_use]
    pub fn handle(&self) -> MemoryCounterStore {
        MemoryCounterStore { backend: self.clone(), observed: Mutex::new(HashMap::new()) }
    }

    /// Returns the persisted value for `scope` without seeding it.
    #[must_use]
    pub fn read_value(&self, scope: &str) -> Option<String> {
        self.records.lock().get(scope).map(|r| r.value.clone())
    }

    /// Overwrites the value for `scope` unconditionally, as an outside writer would.
    pub fn set_value(&self, scope: &str, value: &str) {
        let mut records = self.records.lock();
        let version = records.get(scope).map_or(0, |r| r.version + 1);
        records.insert(scope.to_owned(), Record { value: value.to_owned(), version });
    }
}

/// One caller's view of a [`MemoryBackend`].
///
/// Give each generator its own handle from [`MemoryBackend::handle`]; a
/// handle shared between generators cannot tell their reads apart.
#[derive(Debug)]
pub struct MemoryCounterStore {
    backend: MemoryBackend,
    /// Version of each scope's record as of this handle's last read or write.
    observed: Mutex<HashMap<String, u64>>,
}

impl MemoryCounterStore {
    /// Creates a store over a fresh private backend.
    #[must_use]
    pub fn new() -> Self {
        MemoryBackend::new().handle()
    }

    /// The backend this handle reads and writes.
    #[must_use]
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get_data<'a>(&'a self, scope: &'a str) -> StoreFuture<'a, Option<String>> {
        let record = {
            let mut records = self.backend.records.lock();
            records
                .entry(scope.to_owned())
                .or_insert_with(|| Record { value: SEED_VALUE.to_owned(), version: 0 })
                .clone()
        };
        self.observed.lock().insert(scope.to_owned(), record.version);
        let result: Result<Option<String>, StoreError> = Ok(Some(record.value));
        Box::pin(async move { result })
    }

    fn try_optimistic_write<'a>(
        &'a self,
        scope: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        let written = {
            let mut observed = self.observed.lock();
            let mut records = self.backend.records.lock();
            match (records.get_mut(scope), observed.get(scope).copied()) {
                (Some(record), Some(seen)) if record.version == seen => {
                    record.value = value.to_owned();
                    record.version += 1;
                    observed.insert(scope.to_owned(), record.version);
                    true
                }
                _ => false,
            }
        };
        let result: Result<bool, StoreError> = Ok(written);
        Box::pin(async move { result })
    }
}
