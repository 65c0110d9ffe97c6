//! Batched unique id generation on top of a [`CounterStore`].
//!
//! Each scope reserves a contiguous batch of ids from the store with one
//! optimistic write, then serves the batch from memory. The store is only
//! touched again once the batch runs dry.

mod scope;

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, error, warn};

use crate::config::GeneratorConfig;
use crate::error::AllocatorError;
use crate::ports::CounterStore;
use scope::{Batch, ScopeRegistry};

/// Hands out strictly increasing ids per scope.
///
/// Safe to share between tasks and threads. Several generators, in this
/// process or others, may share one durable medium as long as each owns its
/// own store handle; they never hand out the same id, though their ids
/// interleave.
pub struct UniqueIdGenerator {
    store: Box<dyn CounterStore>,
    scopes: ScopeRegistry,
    batch_size: AtomicU32,
    max_write_attempts: AtomicU32,
}

impl UniqueIdGenerator {
    /// Creates a generator with the default configuration.
    ///
    /// The generator takes ownership of `store`; open a separate handle for
    /// every other generator on the same medium. Does not touch the store.
    pub fn new(store: impl CounterStore + 'static) -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            store: Box::new(store),
            scopes: ScopeRegistry::default(),
            batch_size: AtomicU32::new(defaults.batch_size),
            max_write_attempts: AtomicU32::new(defaults.max_write_attempts),
        }
    }

    /// Creates a generator from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::InvalidConfiguration`] if any setting is zero.
    pub fn from_config(
        store: impl CounterStore + 'static,
        config: &GeneratorConfig,
    ) -> Result<Self, AllocatorError> {
        let generator = Self::new(store);
        generator.set_batch_size(config.batch_size)?;
        generator.set_max_write_attempts(config.max_write_attempts)?;
        Ok(generator)
    }

    /// Number of ids reserved per store write.
    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.batch_size.load(Ordering::Relaxed)
    }

    /// Sets the batch size. Takes effect on the next refill of each scope;
    /// batches already reserved are served out unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::InvalidConfiguration`] if `size` is zero.
    pub fn set_batch_size(&self, size: u32) -> Result<(), AllocatorError> {
        if size < 1 {
            return Err(AllocatorError::InvalidConfiguration {
                setting: "batch_size",
                value: i64::from(size),
            });
        }
        self.batch_size.store(size, Ordering::Relaxed);
        Ok(())
    }

    /// Maximum number of optimistic writes per refill.
    #[must_use]
    pub fn max_write_attempts(&self) -> u32 {
        self.max_write_attempts.load(Ordering::Relaxed)
    }

    /// Sets how many conflicting writes a refill tolerates before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::InvalidConfiguration`] if `attempts` is zero.
    pub fn set_max_write_attempts(&self, attempts: u32) -> Result<(), AllocatorError> {
        if attempts < 1 {
            return Err(AllocatorError::InvalidConfiguration {
                setting: "max_write_attempts",
                value: i64::from(attempts),
            });
        }
        self.max_write_attempts.store(attempts, Ordering::Relaxed);
        Ok(())
    }

    /// Number of scopes this generator has served so far.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Returns the next id for `scope`.
    ///
    /// Callers on the same scope are serialized; a caller that has to refill
    /// holds the others off until the store round trip completes. Other
    /// scopes are unaffected.
    ///
    /// # Errors
    ///
    /// - [`AllocatorError::CorruptData`] if the stored counter is not an integer.
    /// - [`AllocatorError::ContentionExhausted`] if every write attempt conflicted.
    /// - [`AllocatorError::IdSpaceExhausted`] if the next batch would overflow.
    /// - [`AllocatorError::Store`] for any other store failure.
    pub async fn next_id(&self, scope: &str) -> Result<i64, AllocatorError> {
        let state = self.scopes.get_or_create(scope);
        let mut batch = state.batch.lock().await;

        if batch.is_exhausted() {
            *batch = self.reserve_batch(scope).await?;
        }

        Ok(batch.take_next())
    }

    /// Claims a fresh batch for `scope` from the store.
    ///
    /// Nothing is committed to the scope until a write lands, so a failed
    /// refill leaves the scope exhausted and the next call starts over.
    async fn reserve_batch(&self, scope: &str) -> Result<Batch, AllocatorError> {
        let max_attempts = self.max_write_attempts();
        let batch_size = i64::from(self.batch_size());
        let mut attempts = 0;

        while attempts < max_attempts {
            let data = self.store.get_data(scope).await.map_err(AllocatorError::Store)?;
            let next = parse_counter(scope, data)?;
            let batch = Batch::reserve(next, batch_size)
                .ok_or_else(|| AllocatorError::IdSpaceExhausted { scope: scope.to_owned() })?;

            let first_of_next = batch.first_of_next().to_string();
            let written = self
                .store
                .try_optimistic_write(scope, &first_of_next)
                .await
                .map_err(AllocatorError::Store)?;
            attempts += 1;

            if written {
                debug!(
                    scope,
                    first = batch.last_issued + 1,
                    last = batch.highest_available,
                    attempts,
                    "reserved id batch"
                );
                return Ok(batch);
            }
            warn!(
                scope,
                attempt = attempts,
                max_attempts,
                "optimistic write lost to a concurrent writer"
            );
        }

        warn!(scope, attempts, "giving up on id batch after repeated write conflicts");
        Err(AllocatorError::ContentionExhausted { attempts })
    }
}

/// Parses a stored counter. Surrounding whitespace is tolerated.
fn parse_counter(scope: &str, data: Option<String>) -> Result<i64, AllocatorError> {
    if let Some(next) = data.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok()) {
        return Ok(next);
    }
    error!(scope, raw = ?data, "counter store returned corrupt data");
    Err(AllocatorError::CorruptData { scope: scope.to_owned(), raw: data })
}
