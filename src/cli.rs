// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchquery`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchquery",
    version,
    about = "Watch a directory tree and print the files matching a query.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Watchquery.toml")]
    pub config: String,

    /// Directory to watch.
    ///
    /// Default: the directory containing the config file.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Crawl, run the query once and exit without watching.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHQUERY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and validate the config, print it, and exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["watchquery"]).unwrap();
        assert_eq!(args.config, "Watchquery.toml");
        assert!(args.root.is_none());
        assert!(!args.once);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn flags() {
        let args = CliArgs::try_parse_from([
            "watchquery",
            "--config",
            "q.toml",
            "--root",
            "/src",
            "--once",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.root.as_deref(), Some("/src"));
        assert!(args.once && args.dry_run);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
