//! Binary entrypoint for the `batchid` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Store traffic is recorded in commands::dispatch via BATCHID_RECORD=<file>.
    match batchid::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
