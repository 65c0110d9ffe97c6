//! Cassette format for recording and replaying counter store traffic.

pub mod format;
pub mod recorder;
pub mod replayer;
