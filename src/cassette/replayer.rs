//! Serves recorded counter store results back in call order.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction, STORE_PORT};

/// Per-method queues of recorded counter store calls.
///
/// `get_data` and `try_optimistic_write` are drained independently, each in
/// recording order. Interactions stamped with another port are skipped.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<String, VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Queues every counter store interaction of `cassette`.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<String, VecDeque<Interaction>> = HashMap::new();
        for interaction in cassette.interactions.iter().filter(|i| i.port == STORE_PORT) {
            queues.entry(interaction.method.clone()).or_default().push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Number of recorded calls not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Takes the next recorded call to `method`.
    ///
    /// # Panics
    ///
    /// Panics if no call to `method` is left, listing what the cassette still
    /// holds.
    pub fn next_interaction(&mut self, method: &str) -> Interaction {
        if let Some(next) = self.queues.get_mut(method).and_then(VecDeque::pop_front) {
            return next;
        }
        let mut left: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(name, queue)| format!("{name} x{}", queue.len()))
            .collect();
        left.sort();
        panic!(
            "Cassette exhausted: no recorded {method:?} call left (remaining: [{}])",
            left.join(", ")
        );
    }
}
