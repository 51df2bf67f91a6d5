// src/watcher/mod.rs

//! Change-detection backends and their lifecycle.
//!
//! A backend implements [`Watcher`]. It is owned by exactly one root,
//! through a [`WatcherHandle`] which enforces the lifecycle
//! (`Constructed → Started → Stopped`, no restart) and owns the
//! [`ChangeSink`] events flow through. Closing the sink is what guarantees
//! that nothing is delivered once teardown has begun, whatever the backend's
//! own threads are still doing.

pub mod notify_backend;
pub mod sink;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchqueryError};

pub use notify_backend::NotifyWatcher;
pub use sink::{ChangeEvent, ChangeReceiver, ChangeSink};

bitflags! {
    /// Capabilities a backend advertises to the root that owns it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WatcherFlags: u32 {
        /// Notifications name individual files, not just their directory.
        const HAS_PER_FILE_NOTIFICATIONS    = 1 << 0;
        /// A rename may arrive as a single event for both names.
        const COALESCED_RENAME              = 1 << 1;
        /// Only directories can be registered; changes name the directory.
        const ONLY_DIRECTORY_NOTIFICATIONS  = 1 << 2;
        /// Files must be registered one by one via `start_watch_file`.
        const HAS_SPLIT_WATCH               = 1 << 3;
    }
}

/// What a backend gets when asked to start.
#[derive(Debug, Clone)]
pub struct WatchContext {
    pub root: PathBuf,
    pub sink: ChangeSink,
}

/// The capability contract a change-detection backend implements.
pub trait Watcher: Send + Debug {
    fn name(&self) -> &str;

    fn flags(&self) -> WatcherFlags;

    /// Begin delivering notifications for `ctx.root` into `ctx.sink`.
    ///
    /// Backends that need no setup can keep the default. An error here ends
    /// the root's watch session; it is not retried.
    fn start(&mut self, ctx: &WatchContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Register interest in one file, for backends with per-file
    /// registration. An error only concerns this file.
    fn start_watch_file(&mut self, path: &Path) -> Result<()> {
        let _ = path;
        Ok(())
    }

    /// Release every OS resource held. Must be idempotent.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Starting,
    Started,
    Stopped,
}

/// Guard over the watcher state machine.
///
/// `Constructed → Starting → Started → Stopped`; a failed start goes straight
/// to `Stopped`. Nothing leaves `Stopped`.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Constructed,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn begin_start(&mut self) -> std::result::Result<(), LifecycleState> {
        match self.state {
            LifecycleState::Constructed => {
                self.state = LifecycleState::Starting;
                Ok(())
            }
            other => Err(other),
        }
    }

    pub fn mark_started(&mut self) {
        debug_assert_eq!(self.state, LifecycleState::Starting);
        self.state = LifecycleState::Started;
    }

    /// Returns `false` if already stopped.
    pub fn mark_stopped(&mut self) -> bool {
        if self.state == LifecycleState::Stopped {
            return false;
        }
        self.state = LifecycleState::Stopped;
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns a backend and drives it through its lifecycle.
#[derive(Debug)]
pub struct WatcherHandle {
    watcher: Box<dyn Watcher>,
    sink: ChangeSink,
    lifecycle: Lifecycle,
}

impl WatcherHandle {
    pub fn new(watcher: Box<dyn Watcher>, sink: ChangeSink) -> Self {
        Self {
            watcher,
            sink,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.watcher.name()
    }

    pub fn flags(&self) -> WatcherFlags {
        self.watcher.flags()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Start observing `root`.
    ///
    /// On failure the sink is closed and the backend torn down, so it can
    /// never deliver anything afterwards.
    pub fn start(&mut self, root: &Path) -> Result<()> {
        if let Err(state) = self.lifecycle.begin_start() {
            return Err(WatchqueryError::WatcherStart {
                watcher: self.watcher.name().to_string(),
                root: root.to_path_buf(),
                reason: format!("watcher cannot start from state {state:?}"),
            });
        }

        let ctx = WatchContext {
            root: root.to_path_buf(),
            sink: self.sink.clone(),
        };

        match self.watcher.start(&ctx) {
            Ok(()) => {
                self.lifecycle.mark_started();
                info!(watcher = self.watcher.name(), ?root, "watcher started");
                Ok(())
            }
            Err(err) => {
                warn!(watcher = self.watcher.name(), ?root, %err, "watcher failed to start");
                self.stop();
                Err(err)
            }
        }
    }

    /// Register one file with the backend.
    ///
    /// The registration is stamped with a clock tick first, so events the
    /// backend delivers for this path are never older than it.
    pub fn watch_file(&mut self, path: &Path) -> Result<()> {
        if self.state() != LifecycleState::Started {
            return Err(WatchqueryError::WatchFile {
                path: path.to_path_buf(),
                reason: format!("watcher is {:?}", self.state()),
            });
        }
        let registered = self.sink.register(path);
        debug!(?path, ticks = registered.ticks, "registering file with watcher");
        self.watcher.start_watch_file(path)
    }

    /// Tear down the backend. Safe to call any number of times.
    pub fn stop(&mut self) {
        if !self.lifecycle.mark_stopped() {
            return;
        }
        self.sink.close();
        self.watcher.stop();
        debug!(watcher = self.watcher.name(), "watcher stopped");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
