//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `batchid`.
#[derive(Debug, Parser)]
#[command(name = "batchid", version, about = "Hand out unique, increasing ids per scope")]
pub struct Cli {
    /// YAML settings file (defaults to `$BATCHID_CONFIG`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the per-scope counter files.
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Ids reserved per store write.
    #[arg(long, global = true)]
    pub batch_size: Option<u32>,

    /// Conflicting writes tolerated before giving up.
    #[arg(long, global = true)]
    pub max_write_attempts: Option<u32>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the next ids for a scope, one per line.
    Next {
        /// Scope to draw ids from.
        scope: String,
        /// How many ids to print.
        #[arg(long, short = 'n', default_value_t = 1)]
        count: u32,
    },
    /// Print the persisted counter of a scope (the next unreserved id).
    Peek {
        /// Scope to inspect.
        scope: String,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_next_with_count() {
        let cli = Cli::parse_from(["batchid", "next", "orders", "-n", "5"]);
        assert!(matches!(cli.command, Command::Next { ref scope, count: 5 } if scope == "orders"));
    }

    #[test]
    fn next_count_defaults_to_one() {
        let cli = Cli::parse_from(["batchid", "next", "orders"]);
        assert!(matches!(cli.command, Command::Next { count: 1, .. }));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "batchid",
            "peek",
            "orders",
            "--store-dir",
            "/tmp/ids",
            "--batch-size",
            "3",
        ]);
        assert!(matches!(cli.command, Command::Peek { .. }));
        assert_eq!(cli.store_dir.as_deref(), Some(std::path::Path::new("/tmp/ids")));
        assert_eq!(cli.batch_size, Some(3));
        assert_eq!(cli.max_write_attempts, None);
    }

    #[test]
    fn negative_batch_size_is_rejected() {
        assert!(Cli::try_parse_from(["batchid", "--batch-size", "-1", "next", "s"]).is_err());
    }
}
