//! Batched, scope-partitioned unique id generation.
//!
//! [`UniqueIdGenerator`] hands out strictly increasing `i64` ids per named
//! scope. It reserves ids from a [`CounterStore`] in batches with an
//! optimistic compare-and-swap, so the store is hit once per batch rather
//! than once per id, and several generators (in one process or many) can
//! share a store without ever issuing the same id twice.

pub mod adapters;
pub mod allocator;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod ports;

pub use allocator::UniqueIdGenerator;
pub use config::GeneratorConfig;
pub use error::AllocatorError;
pub use ports::CounterStore;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
