//! Records counter store calls into a cassette file.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction, STORE_PORT};

/// Accumulates counter store calls in memory until [`finish`](Self::finish).
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    source: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Starts an empty recording destined for `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self { path: path.into(), name: name.into(), source: source.into(), interactions: Vec::new() }
    }

    /// Appends one store call. Calls are numbered in the order they arrive.
    pub fn record(&mut self, method: &str, input: serde_json::Value, output: serde_json::Value) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: STORE_PORT.to_owned(),
            method: method.to_owned(),
            input,
            output,
        });
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Stamps the recording time and writes the cassette, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            source: self.source,
            interactions: self.interactions,
        };
        cassette.save(&self.path)?;
        Ok(self.path)
    }
}
