//! Errors surfaced by the id allocator.

use thiserror::Error;

use crate::ports::StoreError;

/// Failure of a configuration change or a `next_id` call.
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// A setting was given a value outside its allowed range.
    #[error("{setting} must be a positive number, got {value}")]
    InvalidConfiguration {
        /// Name of the rejected setting.
        setting: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// The store handed back something that is not a counter.
    #[error(
        "The id seed returned from storage for scope '{scope}' was corrupt, and could not be \
         parsed as an integer. The data returned was: {}",
        .raw.as_deref().unwrap_or("<none>")
    )]
    CorruptData {
        /// Scope whose record is corrupt.
        scope: String,
        /// Raw value as read, `None` if the record was empty.
        raw: Option<String>,
    },

    /// Every optimistic write lost the race to another writer.
    #[error(
        "Failed to update the data store after {attempts} attempts. This likely represents too \
         much contention against the store. Increase the batch size to a value more appropriate \
         to your generation load."
    )]
    ContentionExhausted {
        /// Number of writes attempted.
        attempts: u32,
    },

    /// Reserving another batch would run past `i64::MAX`.
    #[error("scope '{scope}' has no ids left to reserve")]
    IdSpaceExhausted {
        /// Scope that ran out of ids.
        scope: String,
    },

    /// The store failed for a reason other than a write conflict.
    #[error("counter store failure: {0}")]
    Store(#[source] StoreError),
}

impl AllocatorError {
    /// Returns `true` for errors a caller may reasonably retry later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ContentionExhausted { .. } | Self::Store(_))
    }
}
