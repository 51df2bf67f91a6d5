// src/root/mod.rs

//! A watched directory tree: clock, store, and the watcher feeding them.

pub mod crawl;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::RootClock;
use crate::errors::Result;
use crate::file::{ContentHashCache, InMemoryFileState, LocalFileState, LocalFileStateOptions};
use crate::fs::{FileSystem, is_not_found};
use crate::query::{Query, QueryResult, execute};
use crate::watcher::{ChangeEvent, ChangeReceiver, ChangeSink, Watcher, WatcherHandle};

pub use store::{ChangeKind, FileStore};

/// State shared between the root and its event pump.
#[derive(Debug)]
struct RootState {
    path: PathBuf,
    clock: Arc<RootClock>,
    store: FileStore,
    fs: Arc<dyn FileSystem>,
    hashes: Arc<ContentHashCache>,
}

impl RootState {
    /// Map `path` (absolute under the root, or already relative) to the
    /// store key. `None` for the root itself or anything outside it.
    fn relativize(&self, path: &Path) -> Option<PathBuf> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.path).ok()?
        } else {
            path
        };
        if rel.as_os_str().is_empty() {
            None
        } else {
            Some(rel.to_path_buf())
        }
    }

    fn full_path(&self, name: &Path) -> PathBuf {
        self.path.join(name)
    }

    /// Re-examine `path` and record the outcome. The store takes the tick
    /// when it applies the update, so no cursor handed out before this call
    /// can cover it.
    fn apply(&self, path: &Path) -> ChangeKind {
        let Some(name) = self.relativize(path) else {
            debug!(?path, root = ?self.path, "ignoring change outside the root");
            return ChangeKind::Ignored;
        };
        let full = self.full_path(&name);
        self.hashes.invalidate(&full);

        match self.fs.symlink_metadata(&full) {
            Ok(info) => {
                let target = if info.is_symlink() {
                    self.fs.read_link(&full).ok()
                } else {
                    None
                };
                let is_dir = info.is_dir();
                let kind = self.store.upsert(&name, info, target, &self.clock);
                if kind == ChangeKind::Created && is_dir {
                    // Children of a directory that appeared in one step
                    // (a move, an extracted archive) get no events of their own.
                    self.crawl_from(&name);
                }
                kind
            }
            Err(err) if is_not_found(&err) => {
                if self.store.mark_removed(&name, &self.clock) > 0 {
                    ChangeKind::Removed
                } else {
                    ChangeKind::Ignored
                }
            }
            Err(err) => {
                warn!(path = ?full, %err, "failed to stat changed path");
                ChangeKind::Ignored
            }
        }
    }

    fn crawl_from(&self, start: &Path) -> usize {
        let result = crawl::walk(self.fs.as_ref(), &self.path, start, &mut |entry| {
            self.store
                .upsert(&entry.name, entry.info, entry.symlink_target, &self.clock);
        });
        match result {
            Ok(count) => count,
            Err(err) => {
                warn!(path = ?self.full_path(start), %err, "failed to crawl directory");
                0
            }
        }
    }
}

/// Query side of a root. Holds no watcher, so it can cross threads freely.
#[derive(Debug, Clone)]
pub struct RootReader {
    state: Arc<RootState>,
    options: LocalFileStateOptions,
}

impl RootReader {
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    pub fn clock(&self) -> &RootClock {
        &self.state.clock
    }

    /// Run `query` against the store.
    ///
    /// Without a usable `since` cursor only existing files are candidates;
    /// with one, removed files observed after it are too. The returned clock
    /// never covers a change the snapshot is missing, even while events are
    /// still queued.
    pub fn query(&self, query: &Query) -> QueryResult<InMemoryFileState> {
        let (as_of, records) = self.state.store.snapshot_as_of(&self.state.clock);
        let ctx = query.context_as_of(&self.state.clock, as_of);
        let fresh = ctx.is_fresh_instance();
        let files: Vec<InMemoryFileState> = records
            .into_iter()
            .filter(|record| !fresh || record.exists)
            .map(|record| {
                InMemoryFileState::new(
                    record,
                    &self.state.path,
                    Arc::clone(&self.state.fs),
                    Arc::clone(&self.state.hashes),
                )
            })
            .collect();
        execute(query, &ctx, files)
    }

    /// Run `query` against an explicit list of paths, probing the
    /// filesystem for each. Paths are relative to the root.
    pub fn query_paths<P: AsRef<Path>>(
        &self,
        query: &Query,
        paths: &[P],
    ) -> QueryResult<LocalFileState> {
        let ctx = query.context(&self.state.clock);
        let files: Vec<LocalFileState> = paths
            .iter()
            .map(|path| {
                LocalFileState::new(
                    &self.state.path,
                    path.as_ref(),
                    ctx.clock_at_start,
                    Arc::clone(&self.state.fs),
                    self.options,
                )
            })
            .collect();
        execute(query, &ctx, files)
    }
}

/// One watched root.
#[derive(Debug)]
pub struct WatchedRoot {
    state: Arc<RootState>,
    watcher: WatcherHandle,
    receiver: Option<ChangeReceiver>,
    pump: Option<JoinHandle<()>>,
    options: LocalFileStateOptions,
    failed: bool,
}

impl WatchedRoot {
    /// Set up a root at `path`. Nothing is read or watched until
    /// [`crawl`](Self::crawl) and [`start`](Self::start).
    pub fn new(
        path: impl Into<PathBuf>,
        watcher: Box<dyn Watcher>,
        fs: Arc<dyn FileSystem>,
        options: LocalFileStateOptions,
    ) -> Self {
        let path = path.into();
        let path = fs.canonicalize(&path).unwrap_or(path);
        let clock = Arc::new(RootClock::new());
        let (sink, receiver) = ChangeSink::new(Arc::clone(&clock));
        info!(root = ?path, root_number = clock.root_number(), "new watched root");

        Self {
            state: Arc::new(RootState {
                path,
                clock,
                store: FileStore::new(),
                fs,
                hashes: Arc::new(ContentHashCache::new()),
            }),
            watcher: WatcherHandle::new(watcher, sink),
            receiver: Some(receiver),
            pump: None,
            options,
            failed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.state.path
    }

    pub fn clock(&self) -> &RootClock {
        &self.state.clock
    }

    pub fn store(&self) -> &FileStore {
        &self.state.store
    }

    pub fn watcher(&self) -> &WatcherHandle {
        &self.watcher
    }

    /// True once the watcher failed to start. The root still answers
    /// queries from what it crawled.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Record every entry below the root, one tick each.
    pub fn crawl(&self) -> Result<usize> {
        let state = &self.state;
        let count = crawl::walk(state.fs.as_ref(), &state.path, Path::new(""), &mut |entry| {
            state
                .store
                .upsert(&entry.name, entry.info, entry.symlink_target, &state.clock);
        })?;
        info!(root = ?state.path, entries = count, "crawl complete");
        Ok(count)
    }

    /// Start the watcher.
    ///
    /// Inside a tokio runtime a task is spawned that applies change events as
    /// they arrive; otherwise they queue until
    /// [`process_pending`](Self::process_pending).
    pub fn start(&mut self) -> Result<()> {
        if let Err(err) = self.watcher.start(&self.state.path) {
            self.failed = true;
            self.receiver = None;
            return Err(err);
        }

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            if let Some(mut receiver) = self.receiver.take() {
                let state = Arc::clone(&self.state);
                self.pump = Some(runtime.spawn(async move {
                    while let Some(event) = receiver.recv().await {
                        apply_event(&state, event);
                    }
                    debug!(root = ?state.path, "change pump ended");
                }));
            }
        }
        Ok(())
    }

    /// Register one file with the watcher, for backends that need it.
    pub fn watch_file(&mut self, path: &Path) -> Result<()> {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.state.full_path(path)
        };
        self.watcher.watch_file(&full)
    }

    /// Apply queued change events. Only needed when no pump task is running.
    pub fn process_pending(&mut self) -> usize {
        let Some(receiver) = self.receiver.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        while let Ok(event) = receiver.try_recv() {
            apply_event(&self.state, event);
            applied += 1;
        }
        applied
    }

    /// Re-examine `path` now and record what happened to it.
    pub fn apply_change(&self, path: &Path) -> ChangeKind {
        self.state.apply(path)
    }

    /// Run `query` against the store. See [`RootReader::query`].
    pub fn query(&self, query: &Query) -> QueryResult<InMemoryFileState> {
        self.reader().query(query)
    }

    /// See [`RootReader::query_paths`].
    pub fn query_paths<P: AsRef<Path>>(
        &self,
        query: &Query,
        paths: &[P],
    ) -> QueryResult<LocalFileState> {
        self.reader().query_paths(query, paths)
    }

    /// A cheap, thread-safe handle for running queries, e.g. from a blocking
    /// task.
    pub fn reader(&self) -> RootReader {
        RootReader {
            state: Arc::clone(&self.state),
            options: self.options,
        }
    }

    /// Tear down the watcher and the event pump. Idempotent.
    pub fn stop(&mut self) {
        self.watcher.stop();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.receiver = None;
    }
}

impl Drop for WatchedRoot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `event.clock` is the delivery stamp; the store stamps the update itself.
fn apply_event(state: &RootState, event: ChangeEvent) {
    let kind = state.apply(&event.path);
    debug!(
        path = ?event.path,
        delivered = event.clock.ticks,
        ticks = state.clock.current().ticks,
        ?kind,
        "applied change"
    );
}
