use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use watchquery::errors::{Result, WatchqueryError};
use watchquery::watcher::{ChangeSink, WatchContext, Watcher, WatcherFlags};

#[derive(Debug, Default)]
struct FakeState {
    sink: Option<ChangeSink>,
    start_calls: usize,
    stop_calls: usize,
    watched_files: Vec<PathBuf>,
    fail_start: Option<String>,
    failing_files: HashSet<PathBuf>,
}

/// Test-side handle onto a [`FakeWatcher`].
///
/// The fake keeps the sink it was started with even after `stop`, the way a
/// backend thread might still be running during teardown, so tests can check
/// that the sink itself refuses late events.
#[derive(Debug, Clone, Default)]
pub struct FakeWatcherControl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWatcherControl {
    /// Inject a change for `path`. Returns whether it was delivered.
    pub fn emit(&self, path: impl Into<PathBuf>) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.deliver(path.into()),
            None => false,
        }
    }

    pub fn start_calls(&self) -> usize {
        self.lock().start_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }

    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.lock().watched_files.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

/// Scriptable in-process backend.
#[derive(Debug)]
pub struct FakeWatcher {
    control: FakeWatcherControl,
    flags: WatcherFlags,
}

impl FakeWatcher {
    pub fn new() -> (Self, FakeWatcherControl) {
        let control = FakeWatcherControl::default();
        let watcher = Self {
            control: control.clone(),
            flags: WatcherFlags::HAS_PER_FILE_NOTIFICATIONS,
        };
        (watcher, control)
    }

    /// A backend whose `start` fails with `reason`.
    pub fn failing(reason: &str) -> (Self, FakeWatcherControl) {
        let (watcher, control) = Self::new();
        control.lock().fail_start = Some(reason.to_string());
        (watcher, control)
    }

    pub fn with_flags(mut self, flags: WatcherFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Make `start_watch_file` fail for `path`.
    pub fn with_failing_file(self, path: impl Into<PathBuf>) -> Self {
        self.control.lock().failing_files.insert(path.into());
        self
    }
}

impl Watcher for FakeWatcher {
    fn name(&self) -> &str {
        "fake"
    }

    fn flags(&self) -> WatcherFlags {
        self.flags
    }

    fn start(&mut self, ctx: &WatchContext) -> Result<()> {
        let mut state = self.control.lock();
        state.start_calls += 1;
        // Grab the sink before deciding to fail, like a backend that spawned
        // its thread and then failed to register the root.
        state.sink = Some(ctx.sink.clone());
        if let Some(reason) = state.fail_start.clone() {
            return Err(WatchqueryError::WatcherStart {
                watcher: "fake".to_string(),
                root: ctx.root.clone(),
                reason,
            });
        }
        Ok(())
    }

    fn start_watch_file(&mut self, path: &Path) -> Result<()> {
        let mut state = self.control.lock();
        if state.failing_files.contains(path) {
            return Err(WatchqueryError::WatchFile {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }
        state.watched_files.push(path.to_path_buf());
        Ok(())
    }

    fn stop(&mut self) {
        self.control.lock().stop_calls += 1;
    }
}
