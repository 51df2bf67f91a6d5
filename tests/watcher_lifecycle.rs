// tests/watcher_lifecycle.rs

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use watchquery::errors::WatchqueryError;
use watchquery::file::LocalFileStateOptions;
use watchquery::fs::RealFileSystem;
use watchquery::query::QueryOptions;
use watchquery::root::{ChangeKind, WatchedRoot};
use watchquery::watcher::{LifecycleState, NotifyWatcher};
use watchquery_test_utils::builders::mock_tree;
use watchquery_test_utils::eventually;
use watchquery_test_utils::fake_watcher::{FakeWatcher, FakeWatcherControl};

use crate::common::{init_tracing, names, query};

fn fake_root(watcher: FakeWatcher) -> WatchedRoot {
    let fs = mock_tree("/r", &[("a.txt", "a")]);
    fs.add_file("/r/b.txt", "b");
    let root = WatchedRoot::new(
        "/r",
        Box::new(watcher),
        Arc::new(fs),
        LocalFileStateOptions::default(),
    );
    root.crawl().unwrap();
    root
}

#[test]
fn failed_start_never_delivers() {
    init_tracing();
    let (watcher, control) = FakeWatcher::failing("no inotify slots");
    let mut root = fake_root(watcher);

    let err = root.start().unwrap_err();
    assert!(matches!(err, WatchqueryError::WatcherStart { .. }));
    assert!(root.is_failed());
    assert_eq!(root.watcher().state(), LifecycleState::Stopped);
    assert_eq!(control.stop_calls(), 1);

    let before = root.clock().current().ticks;
    assert!(!control.emit("/r/b.txt"));
    assert_eq!(root.process_pending(), 0);
    assert_eq!(root.clock().current().ticks, before);

    // The crawl still answers queries.
    assert_eq!(root.store().len(), 2);
}

#[test]
fn started_watcher_feeds_the_store() {
    let (watcher, control) = FakeWatcher::new();
    let mut root = fake_root(watcher);
    root.start().unwrap();
    assert_eq!(root.watcher().state(), LifecycleState::Started);
    assert_eq!(control.start_calls(), 1);

    let after_crawl = root.store().get(Path::new("b.txt")).unwrap().observed;
    assert!(control.emit("/r/b.txt"));
    assert_eq!(root.process_pending(), 1);
    let observed = root.store().get(Path::new("b.txt")).unwrap().observed;
    assert!(observed > after_crawl);

    root.stop();
    assert_eq!(root.watcher().state(), LifecycleState::Stopped);
    assert!(!control.emit("/r/a.txt"));
    assert_eq!(root.process_pending(), 0);
}

#[test]
fn queued_events_are_not_covered_by_an_earlier_cursor() {
    let (watcher, control) = FakeWatcher::new();
    let mut root = fake_root(watcher);
    root.start().unwrap();

    // Delivered but not yet applied when the cursor is taken.
    assert!(control.emit("/r/b.txt"));
    let cursor = root.query(&query(r#""true""#, QueryOptions::default())).clock;
    assert_eq!(root.process_pending(), 1);

    let options = QueryOptions {
        since: Some(cursor),
        ..Default::default()
    };
    let changed = root.query(&query(r#""true""#, options));
    assert!(!changed.is_fresh_instance);
    assert_eq!(names(&changed), vec!["b.txt"]);
}

#[test]
fn stop_is_idempotent_and_final() {
    let (watcher, control) = FakeWatcher::new();
    let mut root = fake_root(watcher);
    root.start().unwrap();
    root.stop();
    root.stop();
    assert_eq!(control.stop_calls(), 1);

    let err = root.start().unwrap_err();
    assert!(matches!(err, WatchqueryError::WatcherStart { .. }));
    assert_eq!(control.start_calls(), 1);
}

#[test]
fn dropping_the_root_stops_the_watcher() {
    let control: FakeWatcherControl;
    {
        let (watcher, c) = FakeWatcher::new();
        control = c;
        let mut root = fake_root(watcher);
        root.start().unwrap();
    }
    assert_eq!(control.stop_calls(), 1);
    assert!(!control.emit("/r/a.txt"));
}

#[test]
fn per_file_failures_stay_local() {
    let (watcher, control) = FakeWatcher::new();
    let watcher = watcher.with_failing_file("/r/b.txt");
    let mut root = fake_root(watcher);

    // Registration needs a running watcher.
    assert!(root.watch_file(Path::new("a.txt")).is_err());

    root.start().unwrap();
    root.watch_file(Path::new("a.txt")).unwrap();
    let err = root.watch_file(Path::new("b.txt")).unwrap_err();
    assert!(matches!(err, WatchqueryError::WatchFile { .. }));

    assert_eq!(root.watcher().state(), LifecycleState::Started);
    assert_eq!(control.watched_files(), vec![Path::new("/r/a.txt").to_path_buf()]);
    assert!(control.emit("/r/a.txt"));
    assert_eq!(root.process_pending(), 1);
}

#[test]
fn removal_events_mark_records_gone() {
    let fs = mock_tree("/r", &[("a.txt", "a"), ("d/x", "x")]);
    let (watcher, control) = FakeWatcher::new();
    let mut root = WatchedRoot::new(
        "/r",
        Box::new(watcher),
        Arc::new(fs.clone()),
        LocalFileStateOptions::default(),
    );
    root.crawl().unwrap();
    root.start().unwrap();

    fs.remove("/r/d");
    assert!(control.emit("/r/d"));
    root.process_pending();

    assert!(!root.store().get(Path::new("d")).unwrap().exists);
    assert!(!root.store().get(Path::new("d/x")).unwrap().exists);
    assert_eq!(root.apply_change(Path::new("/elsewhere/a")), ChangeKind::Ignored);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn native_backend_sees_new_files_until_stopped() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seed.txt"), b"seed").unwrap();

    let mut root = WatchedRoot::new(
        dir.path(),
        Box::new(NotifyWatcher::native()),
        Arc::new(RealFileSystem),
        LocalFileStateOptions::default(),
    );
    assert_eq!(root.crawl().unwrap(), 1);
    root.start().unwrap();

    std::fs::write(dir.path().join("new.txt"), b"hello").unwrap();
    let seen = eventually(Duration::from_secs(5), || {
        root.store()
            .get(Path::new("new.txt"))
            .is_some_and(|r| r.exists)
    })
    .await;
    assert!(seen, "watcher never reported new.txt");

    root.stop();
    std::fs::write(dir.path().join("late.txt"), b"late").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(root.store().get(Path::new("late.txt")).is_none());
}
