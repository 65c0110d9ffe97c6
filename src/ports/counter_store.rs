//! Counter store port for durable, optimistically-updated per-scope counters.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

/// Error type returned by store I/O. Anything other than a write conflict.
pub type StoreError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by [`CounterStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Value an implementation must seed an unseen scope with.
pub const SEED_VALUE: &str = "1";

/// Durable home of one textual counter per scope.
///
/// The stored value is the decimal representation of the next id that no
/// batch has reserved yet. Writes are optimistic: a handle remembers what it
/// last read and a write only lands if nobody changed the value since.
///
/// A handle stands for exactly one caller, so every generator needs its own
/// handle over the shared medium. There is no `Arc<T>` impl for that reason.
pub trait CounterStore: Send + Sync {
    /// Reads the current counter value for `scope`.
    ///
    /// Unseen scopes are seeded with [`SEED_VALUE`] exactly once, even when
    /// several callers race on the first read. `None` means the record exists
    /// but holds no value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get_data<'a>(&'a self, scope: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Attempts to persist `value` as the counter for `scope`.
    ///
    /// Resolves to `Ok(false)` when a concurrent writer changed the value
    /// since this handle's last read.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than a write conflict
    /// (I/O, permissions, ...).
    fn try_optimistic_write<'a>(
        &'a self,
        scope: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, bool>;
}

impl<T: CounterStore + ?Sized> CounterStore for Box<T> {
    fn get_data<'a>(&'a self, scope: &'a str) -> StoreFuture<'a, Option<String>> {
        (**self).get_data(scope)
    }

    fn try_optimistic_write<'a>(
        &'a self,
        scope: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        (**self).try_optimistic_write(scope, value)
    }
}
