//! Directory-backed counter store.
//!
//! Layout, one record per scope:
//!
//! ```text
//! <dir>/
//!   ├── <scope>.txt     decimal "next id not yet reserved"
//!   └── <scope>.lock    present only while a write is in flight
//! ```
//!
//! Writers take the lock file with create-new semantics, so a writer that
//! finds it taken reports a conflict instead of blocking. Counters only grow,
//! which lets the last value read double as the version for the
//! optimistic check.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ports::{CounterStore, StoreError, StoreFuture, SEED_VALUE};

/// Counter store keeping one text file per scope in a directory.
///
/// Safe to use from several processes on the same host. Every generator,
/// in this process or another, needs its own handle: the optimistic check
/// compares against what this handle last read.
#[derive(Debug)]
pub struct FileCounterStore {
    dir: PathBuf,
    /// Value of each scope's record as of this handle's last read or write.
    observed: Mutex<HashMap<String, String>>,
}

impl FileCounterStore {
    /// Creates a store rooted at `dir`. The directory is created on first seed.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), observed: Mutex::new(HashMap::new()) }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the persisted value for `scope` without seeding it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope name is invalid or the file cannot be read.
    pub async fn persisted_value(&self, scope: &str) -> Result<Option<String>, StoreError> {
        let path = self.record_path(scope)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read {}: {e}", path.display()).into()),
        }
    }

    fn record_path(&self, scope: &str) -> Result<PathBuf, StoreError> {
        validate_scope(scope)?;
        Ok(self.dir.join(format!("{scope}.txt")))
    }

    fn lock_path(&self, scope: &str) -> PathBuf {
        self.dir.join(format!("{scope}.lock"))
    }

    fn temp_path(&self, scope: &str) -> PathBuf {
        self.dir.join(format!(".{scope}.{}.tmp", Uuid::new_v4()))
    }

    async fn read_or_seed(&self, scope: &str) -> Result<Option<String>, StoreError> {
        let path = self.record_path(scope)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.seed(scope, &path).await?;
                fs::read_to_string(&path)
                    .await
                    .map_err(|e| format!("Failed to read {}: {e}", path.display()))?
            }
            Err(e) => return Err(format!("Failed to read {}: {e}", path.display()).into()),
        };

        self.observed.lock().insert(scope.to_owned(), content.trim().to_owned());
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    async fn write_if_unchanged(&self, scope: &str, value: &str) -> Result<bool, StoreError> {
        let path = self.record_path(scope)?;
        let lock = self.lock_path(scope);

        match fs::OpenOptions::new().write(true).create_new(true).open(&lock).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(scope, "counter record locked by another writer");
                return Ok(false);
            }
            Err(e) => return Err(format!("Failed to lock {}: {e}", lock.display()).into()),
        }

        let result = self.write_locked(scope, &path, value).await;
        if let Err(e) = fs::remove_file(&lock).await {
            warn!(scope, lock = %lock.display(), error = %e, "failed to release lock file");
        }
        result
    }

    /// Creates the record with the seed value unless someone already did.
    async fn seed(&self, scope: &str, path: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| format!("Failed to create store directory {}: {e}", self.dir.display()))?;

        // Linking a fully written temp file into place never replaces an
        // existing record, so exactly one seeder wins and nobody sees a
        // half-written file.
        let temp = self.temp_path(scope);
        fs::write(&temp, SEED_VALUE)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", temp.display()))?;
        let linked = fs::hard_link(&temp, path).await;
        let _ = fs::remove_file(&temp).await;

        match linked {
            Ok(()) => {
                debug!(scope, path = %path.display(), "seeded counter record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(format!("Failed to seed {}: {e}", path.display()).into()),
        }
    }

    /// Compares and swaps the record while holding the scope's lock file.
    async fn write_locked(
        &self,
        scope: &str,
        path: &Path,
        value: &str,
    ) -> Result<bool, StoreError> {
        let current = fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let unchanged =
            self.observed.lock().get(scope).is_some_and(|seen| seen == current.trim());
        if !unchanged {
            return Ok(false);
        }

        let temp = self.temp_path(scope);
        fs::write(&temp, value)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", temp.display()))?;
        if let Err(e) = fs::rename(&temp, path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(format!("Failed to replace {}: {e}", path.display()).into());
        }

        self.observed.lock().insert(scope.to_owned(), value.trim().to_owned());
        Ok(true)
    }
}

impl CounterStore for FileCounterStore {
    fn get_data<'a>(&'a self, scope: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(self.read_or_seed(scope))
    }

    fn try_optimistic_write<'a>(
        &'a self,
        scope: &'a str,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        Box::pin(self.write_if_unchanged(scope, value))
    }
}

/// Scope names become file names, so they must not escape the directory.
fn validate_scope(scope: &str) -> Result<(), StoreError> {
    let valid = !scope.is_empty()
        && !scope.starts_with('.')
        && !scope.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if valid {
        Ok(())
    } else {
        Err(format!("Invalid scope name for file store: {scope:?}").into())
    }
}
