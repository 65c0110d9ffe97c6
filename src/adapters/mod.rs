//! Counter store implementations.

pub mod file;
pub mod memory;
pub mod recording;
pub mod replaying;

pub use file::FileCounterStore;
pub use memory::{MemoryBackend, MemoryCounterStore};
pub use recording::RecordingCounterStore;
pub use replaying::ReplayingCounterStore;
