// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod file;
pub mod fs;
pub mod logging;
pub mod query;
pub mod root;
pub mod types;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::clock::{ClockPosition, RootClock, deadline_after};
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::file::FileState;
use crate::fs::{FileSystem, RealFileSystem};
use crate::query::{Query, QueryResult, registry};
use crate::root::{RootReader, WatchedRoot};
use crate::watcher::NotifyWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the watched root (crawl + watcher backend)
/// - the initial query and the incremental re-query loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let query = cfg.build_query(registry::global())?;
    let root_dir = args
        .root
        .map(PathBuf::from)
        .unwrap_or_else(|| config_root_dir(&config_path));

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let watcher = NotifyWatcher::new(
        cfg.config.watcher,
        Duration::from_millis(cfg.config.poll_interval_ms),
    );
    let mut root = WatchedRoot::new(root_dir, Box::new(watcher), fs, cfg.file_state_options());

    root.crawl()?;

    if !args.once {
        root.start()?;
    }

    let query_paths = cfg.query.paths.clone();
    let timeout_ms = cfg.config.timeout_ms;

    let mut cursor = run_query(
        root.reader(),
        &query,
        cfg.since(),
        query_paths.clone(),
        timeout_ms,
    )
    .await?;

    if args.once {
        root.stop();
        return Ok(());
    }

    let settle = Duration::from_millis(cfg.config.settle_ms);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(err) = res {
                    warn!("failed to listen for Ctrl+C: {err}");
                }
                info!("shutdown requested");
                break;
            }
            ticks = wait_for_settle(root.clock(), cursor.ticks, settle) => {
                debug!(ticks, "changes settled");
                cursor = run_query(
                    root.reader(),
                    &query,
                    Some(cursor),
                    query_paths.clone(),
                    timeout_ms,
                )
                .await?;
            }
        }
    }

    root.stop();
    Ok(())
}

/// Run the query on a blocking thread, bounded by `timeout_ms`, print the
/// matches and return the cursor for the next run.
///
/// Evaluation itself can't be interrupted; on timeout its result is
/// discarded.
async fn run_query(
    reader: RootReader,
    query: &Query,
    since: Option<ClockPosition>,
    paths: Option<Vec<String>>,
    timeout_ms: u64,
) -> Result<ClockPosition> {
    let mut query = query.clone();
    query.options.since = since;

    let task = tokio::task::spawn_blocking(move || match paths {
        Some(paths) => print_result(reader.query_paths(&query, paths.as_slice())),
        None => print_result(reader.query(&query)),
    });

    let joined = match deadline_after(timeout_ms) {
        Some(deadline) => tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), task)
            .await
            .map_err(|_| anyhow!("query did not finish within {timeout_ms}ms"))?,
        None => task.await,
    };
    Ok(joined?)
}

fn print_result<F: FileState>(mut result: QueryResult<F>) -> ClockPosition {
    for file in result.matches.iter_mut() {
        let status = match file.exists() {
            Some(true) => "",
            Some(false) => "\t(removed)",
            None => "\t(unknown)",
        };
        println!("{}{status}", file.name().display());
    }
    info!(
        clock = %result.clock,
        fresh_instance = result.is_fresh_instance,
        matches = result.matches.len(),
        indeterminate = result.indeterminate,
        "query complete"
    );
    result.clock
}

/// Wait until the root's clock has moved past `since` and then stayed still
/// for one `settle` period. Returns the settled tick count.
async fn wait_for_settle(clock: &RootClock, since: u64, settle: Duration) -> u64 {
    let mut seen = since;
    loop {
        tokio::time::sleep(settle).await;
        let now = clock.current().ticks;
        if now == seen && now > since {
            return now;
        }
        seen = now;
    }
}

/// Figure out a sensible root to watch.
///
/// - If the config path has a non-empty parent (e.g. "proj/Watchquery.toml"),
///   we use that directory.
/// - If it's just a bare filename, fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the validated config without touching the filesystem.
fn print_dry_run(cfg: &ConfigFile) {
    println!("watchquery dry-run");
    println!("  config.watcher = {:?}", cfg.config.watcher);
    if cfg.config.watcher == types::WatcherBackendKind::Poll {
        println!("  config.poll_interval_ms = {}", cfg.config.poll_interval_ms);
    }
    println!("  config.settle_ms = {}", cfg.config.settle_ms);
    println!("  config.timeout_ms = {}", cfg.config.timeout_ms);
    println!("  config.case_sensitive = {}", cfg.config.case_sensitive);
    println!("  config.missing_entry = {:?}", cfg.config.missing_entry);
    println!();

    println!("query:");
    println!("  expression: {}", cfg.query.expression);
    if let Some(since) = cfg.since() {
        println!("  since: {since}");
    }
    println!("  indeterminate: {:?}", cfg.query.indeterminate);
    if let Some(ref paths) = cfg.query.paths {
        println!("  paths ({}):", paths.len());
        for path in paths {
            println!("    - {path}");
        }
    }
    if cfg.query.parallel {
        println!("  parallel: true");
    }

    debug!("dry-run complete (no watching)");
}
