//! Port traits defining external boundaries.
//!
//! The allocator core talks to durable storage only through these traits.
//! Implementations live in `src/adapters/`.

pub mod counter_store;

pub use counter_store::{CounterStore, StoreError, StoreFuture, SEED_VALUE};
