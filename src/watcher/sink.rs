// src/watcher/sink.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::clock::{ClockValue, RootClock};

/// A path reported as changed, stamped with the tick it was delivered at.
///
/// The stamp orders the event against per-file registrations; the store
/// takes its own tick when the change is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub clock: ClockValue,
}

pub type ChangeReceiver = mpsc::UnboundedReceiver<ChangeEvent>;

#[derive(Debug)]
struct SinkShared {
    open: AtomicBool,
    /// Tick at which each individually registered file was registered.
    registrations: Mutex<HashMap<PathBuf, u64>>,
}

/// Where a backend delivers notifications.
///
/// Cloneable so a backend can move a copy into its OS callback thread.
/// Once [`close`](Self::close) has been called every further delivery is
/// dropped.
#[derive(Debug, Clone)]
pub struct ChangeSink {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    clock: Arc<RootClock>,
    shared: Arc<SinkShared>,
}

impl ChangeSink {
    pub fn new(clock: Arc<RootClock>) -> (Self, ChangeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            clock,
            shared: Arc::new(SinkShared {
                open: AtomicBool::new(true),
                registrations: Mutex::new(HashMap::new()),
            }),
        };
        (sink, rx)
    }

    /// Report `path` as changed. Returns whether the event was delivered.
    pub fn deliver(&self, path: PathBuf) -> bool {
        if !self.is_open() {
            trace!(?path, "sink closed; dropping event");
            return false;
        }

        let clock = self.clock.tick();
        self.send_stamped(path, clock)
    }

    /// Send `path` stamped with `clock`. A stamp older than the path's
    /// registration is replaced with a fresh tick, so no event is ever
    /// ordered before the registration it follows.
    pub(crate) fn send_stamped(&self, path: PathBuf, clock: ClockValue) -> bool {
        let registered = self.registrations().get(&path).copied();
        let clock = match registered {
            Some(registered) if clock.ticks < registered => {
                let restamped = self.clock.tick();
                debug!(
                    ?path,
                    stamped = clock.ticks,
                    registered,
                    restamped = restamped.ticks,
                    "event stamped before its registration; restamping"
                );
                restamped
            }
            _ => clock,
        };

        // Teardown may have started while we ticked.
        if !self.is_open() {
            return false;
        }
        self.tx.send(ChangeEvent { path, clock }).is_ok()
    }

    /// Record a per-file registration and return the tick it was stamped with.
    pub fn register(&self, path: &Path) -> ClockValue {
        let clock = self.clock.tick();
        self.registrations().insert(path.to_path_buf(), clock.ticks);
        clock
    }

    pub fn close(&self) {
        self.shared.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    fn registrations(&self) -> MutexGuard<'_, HashMap<PathBuf, u64>> {
        self.shared
            .registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_until_closed() {
        let (sink, mut rx) = ChangeSink::new(Arc::new(RootClock::new()));
        assert!(sink.deliver(PathBuf::from("a")));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.path, PathBuf::from("a"));
        assert_eq!(event.clock.ticks, 1);

        sink.close();
        assert!(!sink.deliver(PathBuf::from("b")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clones_share_the_open_flag() {
        let (sink, _rx) = ChangeSink::new(Arc::new(RootClock::new()));
        let backend_copy = sink.clone();
        sink.close();
        assert!(!backend_copy.is_open());
        assert!(!backend_copy.deliver(PathBuf::from("a")));
    }

    #[test]
    fn events_follow_their_registration() {
        let (sink, mut rx) = ChangeSink::new(Arc::new(RootClock::new()));
        let registered = sink.register(Path::new("a"));
        assert!(sink.deliver(PathBuf::from("a")));
        let event = rx.try_recv().unwrap();
        assert!(event.clock > registered);
    }

    #[test]
    fn stale_stamp_is_restamped_after_registration() {
        let clock = Arc::new(RootClock::new());
        let (sink, mut rx) = ChangeSink::new(Arc::clone(&clock));
        let stale = clock.tick();
        let registered = sink.register(Path::new("a"));

        assert!(sink.send_stamped(PathBuf::from("a"), stale));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.path, PathBuf::from("a"));
        assert!(event.clock > registered);

        // Paths without a registration keep their stamp.
        assert!(sink.send_stamped(PathBuf::from("b"), stale));
        assert_eq!(rx.try_recv().unwrap().clock, stale);
    }

    #[test]
    fn dropped_receiver_reports_undelivered() {
        let (sink, rx) = ChangeSink::new(Arc::new(RootClock::new()));
        drop(rx);
        assert!(!sink.deliver(PathBuf::from("a")));
    }
}
