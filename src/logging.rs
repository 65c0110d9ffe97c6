//! Diagnostic logging setup for the `batchid` binary.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used, and an
/// unparseable level falls back to `warn`. Calling this more than once is
/// harmless: later calls leave the first subscriber in place.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::init;

    #[test]
    fn repeated_init_does_not_panic() {
        init("debug");
        init("not a level ((");
        tracing::debug!("logging initialized twice");
    }
}
