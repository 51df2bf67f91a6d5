// src/watcher/notify_backend.rs

use std::path::Path;
use std::time::Duration;

use notify::Watcher as _;
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode};
use tracing::{debug, trace, warn};

use crate::errors::{Result, WatchqueryError};
use crate::types::WatcherBackendKind;
use crate::watcher::{ChangeSink, WatchContext, Watcher, WatcherFlags};

/// Backend over the `notify` crate: the platform's native API, or periodic
/// polling for filesystems that don't support it.
pub struct NotifyWatcher {
    kind: WatcherBackendKind,
    poll_interval: Duration,
    /// Kept alive while watching; dropping it stops the OS watch.
    inner: Option<Box<dyn notify::Watcher + Send>>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("kind", &self.kind)
            .field("poll_interval", &self.poll_interval)
            .field("active", &self.inner.is_some())
            .finish()
    }
}

impl NotifyWatcher {
    pub fn new(kind: WatcherBackendKind, poll_interval: Duration) -> Self {
        Self {
            kind,
            poll_interval,
            inner: None,
        }
    }

    pub fn native() -> Self {
        Self::new(WatcherBackendKind::Notify, Duration::from_secs(1))
    }

    pub fn polling(interval: Duration) -> Self {
        Self::new(WatcherBackendKind::Poll, interval)
    }

    fn start_error(&self, root: &Path, err: impl std::fmt::Display) -> WatchqueryError {
        WatchqueryError::WatcherStart {
            watcher: self.name().to_string(),
            root: root.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Closure called synchronously by notify, on its own thread.
fn event_handler(sink: ChangeSink) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            trace!(?event, "notify event");
            for path in event.paths {
                if !sink.deliver(path) {
                    return;
                }
            }
        }
        Err(err) => {
            if sink.is_open() {
                warn!("file watch error: {err}");
            }
        }
    }
}

impl Watcher for NotifyWatcher {
    fn name(&self) -> &str {
        match self.kind {
            WatcherBackendKind::Notify => "notify",
            WatcherBackendKind::Poll => "poll",
        }
    }

    fn flags(&self) -> WatcherFlags {
        match self.kind {
            WatcherBackendKind::Notify if cfg!(target_os = "macos") => {
                WatcherFlags::HAS_PER_FILE_NOTIFICATIONS | WatcherFlags::COALESCED_RENAME
            }
            _ => WatcherFlags::HAS_PER_FILE_NOTIFICATIONS,
        }
    }

    fn start(&mut self, ctx: &WatchContext) -> Result<()> {
        let handler = event_handler(ctx.sink.clone());

        let mut watcher: Box<dyn notify::Watcher + Send> = match self.kind {
            WatcherBackendKind::Notify => Box::new(
                RecommendedWatcher::new(handler, Config::default())
                    .map_err(|err| self.start_error(&ctx.root, err))?,
            ),
            WatcherBackendKind::Poll => Box::new(
                PollWatcher::new(
                    handler,
                    Config::default().with_poll_interval(self.poll_interval),
                )
                .map_err(|err| self.start_error(&ctx.root, err))?,
            ),
        };

        watcher
            .watch(&ctx.root, RecursiveMode::Recursive)
            .map_err(|err| self.start_error(&ctx.root, err))?;

        debug!(backend = self.name(), root = ?ctx.root, "notify watch registered");
        self.inner = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) {
        if self.inner.take().is_some() {
            debug!(backend = self.name(), "notify watcher released");
        }
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RootClock;
    use std::sync::Arc;

    #[test]
    fn missing_root_fails_to_start() {
        let (sink, _rx) = ChangeSink::new(Arc::new(RootClock::new()));
        let mut watcher = NotifyWatcher::native();
        let ctx = WatchContext {
            root: "/definitely/not/a/real/watchquery/root".into(),
            sink,
        };
        let err = watcher.start(&ctx).unwrap_err();
        assert!(matches!(err, WatchqueryError::WatcherStart { .. }));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut watcher = NotifyWatcher::native();
        watcher.stop();
        watcher.stop();
        assert_eq!(watcher.name(), "notify");
    }
}
