//! `batchid next` command.

use crate::allocator::UniqueIdGenerator;
use crate::config::Settings;
use crate::error::AllocatorError;
use crate::ports::CounterStore;

/// Execute the `next` command, printing `count` ids for `scope`.
///
/// Each id is printed as soon as it is allocated, so a failure part way
/// through still leaves the ids already handed out on stdout.
///
/// # Errors
///
/// Returns an error string if the generator cannot be configured or an id
/// cannot be allocated.
pub async fn run(
    store: impl CounterStore + 'static,
    settings: &Settings,
    scope: &str,
    count: u32,
) -> Result<(), String> {
    let generator =
        UniqueIdGenerator::from_config(store, &settings.generator).map_err(|e| e.to_string())?;
    allocate(&generator, scope, count, |id| println!("{id}")).await
}

/// Draws `count` ids for `scope` from `generator`, passing each to `emit`.
///
/// # Errors
///
/// Returns the first allocation failure as a string. Ids emitted before the
/// failure stay emitted.
pub async fn allocate(
    generator: &UniqueIdGenerator,
    scope: &str,
    count: u32,
    mut emit: impl FnMut(i64),
) -> Result<(), String> {
    for _ in 0..count {
        let id = generator.next_id(scope).await.map_err(|e| describe_failure(scope, &e))?;
        emit(id);
    }
    Ok(())
}

fn describe_failure(scope: &str, err: &AllocatorError) -> String {
    let mut msg = format!("Failed to allocate id for scope {scope}: {err}");
    if err.is_transient() {
        msg.push_str(" (transient, the command may be retried)");
    }
    msg
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::adapters::memory::MemoryBackend;
    use crate::adapters::replaying::ReplayingCounterStore;
    use crate::cassette::format::{Cassette, Interaction, STORE_PORT};
    use crate::cassette::replayer::CassetteReplayer;

    async fn collect(
        generator: &UniqueIdGenerator,
        scope: &str,
        count: u32,
    ) -> (Vec<i64>, Result<(), String>) {
        let mut ids = Vec::new();
        let result = allocate(generator, scope, count, |id| ids.push(id)).await;
        (ids, result)
    }

    #[tokio::test]
    async fn allocates_requested_count() {
        let backend = MemoryBackend::new();
        let generator = UniqueIdGenerator::new(backend.handle());
        generator.set_batch_size(2).unwrap();

        let (ids, result) = collect(&generator, "orders", 5).await;
        result.unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(backend.read_value("orders").as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn zero_count_touches_nothing() {
        let backend = MemoryBackend::new();
        let generator = UniqueIdGenerator::new(backend.handle());

        let (ids, result) = collect(&generator, "orders", 0).await;
        result.unwrap();
        assert!(ids.is_empty());
        assert_eq!(backend.read_value("orders"), None);
    }

    #[tokio::test]
    async fn ids_before_a_failure_are_still_emitted() {
        let backend = MemoryBackend::new();
        let generator = UniqueIdGenerator::new(backend.handle());
        generator.set_batch_size(2).unwrap();
        assert_eq!(generator.next_id("orders").await.unwrap(), 1);
        // The next refill reads garbage.
        backend.set_value("orders", "garbage");

        let (ids, result) = collect(&generator, "orders", 4).await;
        assert_eq!(ids, vec![2]);
        assert!(result.unwrap_err().contains("garbage"));
    }

    #[tokio::test]
    async fn failure_names_the_scope() {
        let backend = MemoryBackend::new();
        backend.set_value("orders", "not-a-number");
        let generator = UniqueIdGenerator::new(backend.handle());

        let (_, result) = collect(&generator, "orders", 1).await;
        let err = result.unwrap_err();
        assert!(err.starts_with("Failed to allocate id for scope orders"));
        assert!(err.contains("not-a-number"));
        assert!(!err.contains("may be retried"));
    }

    #[tokio::test]
    async fn contention_is_reported_as_retryable() {
        let interactions = ["get_data", "try_optimistic_write"]
            .iter()
            .zip([json!({"ok": "1"}), json!({"ok": false})])
            .enumerate()
            .map(|(seq, (method, output))| Interaction {
                seq: seq as u64,
                port: STORE_PORT.into(),
                method: (*method).into(),
                input: json!({}),
                output,
            })
            .collect();
        let cassette = Cassette {
            name: "contended".into(),
            recorded_at: Utc::now(),
            source: "scripted".into(),
            interactions,
        };
        let store = ReplayingCounterStore::new(CassetteReplayer::new(&cassette));
        let generator = UniqueIdGenerator::new(store);
        generator.set_max_write_attempts(1).unwrap();

        let (ids, result) = collect(&generator, "orders", 1).await;
        assert!(ids.is_empty());
        let err = result.unwrap_err();
        assert!(err.contains("after 1 attempts"));
        assert!(err.ends_with("(transient, the command may be retried)"));
    }

    #[tokio::test]
    async fn invalid_settings_fail_before_allocating() {
        let backend = MemoryBackend::new();
        let mut settings = Settings::default();
        settings.generator.max_write_attempts = 0;

        let err = run(backend.handle(), &settings, "orders", 1).await.unwrap_err();
        assert!(err.contains("max_write_attempts"));
        assert_eq!(backend.read_value("orders"), None);
    }
}
