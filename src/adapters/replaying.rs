//! Replaying counter store serving results from a cassette.

use std::path::Path;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CounterStore, StoreError, StoreFuture};

/// Serves recorded `get_data` / `try_optimistic_write` results in order.
///
/// Arguments are ignored; only the order of calls matters. Running past the
/// end of the cassette panics.
pub struct ReplayingCounterStore {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingCounterStore {
    /// Creates a replaying store from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    /// Loads a cassette file and replays it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        Ok(Self::new(CassetteReplayer::new(&Cassette::load(path)?)))
    }

    /// Number of recorded calls not yet replayed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replayer.lock().remaining()
    }

    fn next_output(&self, method: &str) -> serde_json::Value {
        self.replayer.lock().next_interaction(method).output
    }
}

/// Extracts a Result from a cassette output JSON value.
///
/// Expects `{"ok": <value>}` or `{"err": "message"}`.
fn extract_result<T: DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, StoreError> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}

impl CounterStore for ReplayingCounterStore {
    fn get_data<'a>(&'a self, _scope: &'a str) -> StoreFuture<'a, Option<String>> {
        let result: Result<Option<String>, StoreError> =
            extract_result(&self.next_output("get_data"), "counter_store::get_data");
        Box::pin(async move { result })
    }

    fn try_optimistic_write<'a>(
        &'a self,
        _scope: &'a str,
        _value: &'a str,
    ) -> StoreFuture<'a, bool> {
        let result: Result<bool, StoreError> = extract_result(
            &self.next_output("try_optimistic_write"),
            "counter_store::try_optimistic_write",
        );
        Box::pin(async move { result })
    }
}
