//! `batchid peek` command.

use crate::ports::CounterStore;

/// Execute the `peek` command, printing the persisted counter of `scope`.
///
/// An unseen scope is seeded by the read, like any first access.
///
/// # Errors
///
/// Returns an error string if the store cannot be read.
pub async fn run(store: &dyn CounterStore, scope: &str) -> Result<(), String> {
    println!("{}", read_counter(store, scope).await?);
    Ok(())
}

/// Reads the raw counter value of `scope`.
///
/// # Errors
///
/// Returns an error string if the store fails or holds no value.
pub async fn read_counter(store: &dyn CounterStore, scope: &str) -> Result<String, String> {
    store
        .get_data(scope)
        .await
        .map_err(|e| format!("Failed to read counter for scope {scope}: {e}"))?
        .map(|value| value.trim().to_string())
        .ok_or_else(|| format!("Counter for scope {scope} is empty"))
}
