//! Command dispatch and handlers.

pub mod next;
pub mod peek;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adapters::{FileCounterStore, RecordingCounterStore};
use crate::cassette::recorder::CassetteRecorder;
use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::ports::CounterStore;

/// Dispatch a parsed command line to its handler.
///
/// When `BATCHID_RECORD` is set to a file path, every counter store call is
/// recorded to a cassette at that path.
///
/// # Errors
///
/// Returns an error string if settings are invalid or the command fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings = resolve_settings(cli)?;
    crate::logging::init(&settings.log_level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    let file_store = FileCounterStore::new(&settings.store_dir);
    let recorder = env::var_os("BATCHID_RECORD").map(|path| {
        let source = format!("file:{}", settings.store_dir.display());
        let recorder = CassetteRecorder::new(PathBuf::from(path), "batchid-session", source);
        Arc::new(Mutex::new(recorder))
    });
    let store: Box<dyn CounterStore> = match &recorder {
        Some(recorder) => Box::new(RecordingCounterStore::new(file_store, Arc::clone(recorder))),
        None => Box::new(file_store),
    };

    let result = runtime.block_on(async move {
        match &cli.command {
            Command::Next { scope, count } => next::run(store, &settings, scope, *count).await,
            Command::Peek { scope } => peek::run(store.as_ref(), scope).await,
        }
    });

    // Finish recording after the command completes (even on error).
    if let Some(recorder) = recorder {
        finish_recording(recorder)?;
    }

    result
}

/// Layers CLI flags over file and environment settings.
fn resolve_settings(cli: &Cli) -> Result<Settings, String> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.store_dir {
        settings.store_dir.clone_from(dir);
    }
    if let Some(size) = cli.batch_size {
        settings.generator.batch_size = size;
    }
    if let Some(attempts) = cli.max_write_attempts {
        settings.generator.max_write_attempts = attempts;
    }
    settings.validate()?;
    Ok(settings)
}

fn finish_recording(recorder: Arc<Mutex<CassetteRecorder>>) -> Result<(), String> {
    let recorder = Arc::try_unwrap(recorder)
        .map_err(|_| "Recording still in use after command finished".to_string())?
        .into_inner();
    let path = recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))?;
    eprintln!("Recording saved to: {}", path.display());
    Ok(())
}
