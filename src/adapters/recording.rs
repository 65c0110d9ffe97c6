//! Recording counter store that captures traffic to a cassette.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;

use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{CounterStore, StoreError, StoreFuture};

/// Records every store call while delegating to an inner implementation.
pub struct RecordingCounterStore {
    inner: Box<dyn CounterStore>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingCounterStore {
    /// Wraps `inner`, appending each call and its result to `recorder`.
    pub fn new(
        inner: impl CounterStore + 'static,
        recorder: Arc<Mutex<CassetteRecorder>>,
    ) -> Self {
        Self { inner: Box::new(inner), recorder }
    }

    /// Appends one call using the `{"ok": v}` / `{"err": msg}` convention.
    fn record<T: Serialize>(
        &self,
        method: &str,
        input: serde_json::Value,
        result: &Result<T, StoreError>,
    ) {
        let output = match result {
            Ok(v) => json!({ "ok": v }),
            Err(e) => json!({ "err": e.to_string() }),
        };
        self.recorder.lock().record(method, input, output);
    }
}

impl CounterStore for RecordingCounterStore {
    fn get_data<'a>(&'a self, scope: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let result = self.inner.get_data(scope).await;
            self.record("get_data", json!({ "scope": scope }), &result);
            result
        })
    }

    fn try_optimistic_write<'a>(
        &'a self,
        scope: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = self.inner.try_optimistic_write(scope, value).await;
            let input = json!({ "scope": scope, "value": value });
            self.record("try_optimistic_write", input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryCounterStore;
    use crate::adapters::replaying::ReplayingCounterStore;

    #[tokio::test]
    async fn recorded_traffic_replays_identically() {
        let dir =
            std::env::temp_dir().join(format!("batchid_recording_{}", uuid::Uuid::new_v4()));
        let path = dir.join("store.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "memory")));

        let live = {
            let store =
                RecordingCounterStore::new(MemoryCounterStore::new(), Arc::clone(&recorder));
            let first = store.get_data("orders").await.unwrap();
            let written = store.try_optimistic_write("orders", "101").await.unwrap();
            let stale = store.try_optimistic_write("nobody-read-me", "5").await.unwrap();
            (first, written, stale)
        };
        assert_eq!(live, (Some("1".to_string()), true, false));

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner();
        assert_eq!(recorder.len(), 3);
        recorder.finish().unwrap();

        let replay = ReplayingCounterStore::from_file(&path).unwrap();
        let replayed = (
            replay.get_data("orders").await.unwrap(),
            replay.try_optimistic_write("orders", "101").await.unwrap(),
            replay.try_optimistic_write("nobody-read-me", "5").await.unwrap(),
        );
        assert_eq!(replayed, live);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
