// tests/empty_predicate.rs

mod common;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use watchquery::clock::{ClockValue, RootClock};
use watchquery::file::{
    ContentHashCache, FileKind, InMemoryFileState, LocalFileState, LocalFileStateOptions,
};
use watchquery::fs::RealFileSystem;
use watchquery::fs::mock::MockFileSystem;
use watchquery::query::{EvaluateResult, Query, QueryOptions};
use watchquery_test_utils::builders::FileRecordBuilder;

use crate::common::query;

fn empty() -> Query {
    query(r#""empty""#, QueryOptions::default())
}

fn eval_record(record: watchquery::file::FileRecord) -> EvaluateResult {
    let q = empty();
    let clock = RootClock::new();
    let mut file = InMemoryFileState::new(
        record,
        Path::new("/r"),
        Arc::new(MockFileSystem::new()),
        Arc::new(ContentHashCache::new()),
    );
    q.evaluate(&q.context(&clock), &mut file)
}

fn eval_local(fs: Arc<dyn watchquery::fs::FileSystem>, root: &Path, name: &str) -> EvaluateResult {
    let q = empty();
    let clock = RootClock::new();
    let mut file = LocalFileState::new(
        root,
        name,
        ClockValue::new(1, SystemTime::now()),
        fs,
        LocalFileStateOptions::default(),
    );
    q.evaluate(&q.context(&clock), &mut file)
}

#[test]
fn empty_regular_file() {
    assert_eq!(
        eval_record(FileRecordBuilder::file("a", 0).build()),
        EvaluateResult::True
    );
}

#[test]
fn non_empty_regular_file() {
    assert_eq!(
        eval_record(FileRecordBuilder::file("a", 10).build()),
        EvaluateResult::False
    );
}

#[test]
fn zero_sized_directory() {
    assert_eq!(
        eval_record(FileRecordBuilder::dir("d").build()),
        EvaluateResult::True
    );
}

#[test]
fn removed_file_is_never_empty() {
    assert_eq!(
        eval_record(FileRecordBuilder::file("a", 0).removed().build()),
        EvaluateResult::False
    );
}

#[test]
fn existing_file_without_stat_is_indeterminate() {
    assert_eq!(
        eval_record(FileRecordBuilder::file("a", 0).without_info().build()),
        EvaluateResult::Indeterminate
    );
}

#[test]
fn symlink_is_not_empty() {
    let fs = MockFileSystem::new();
    fs.add_symlink("/r/link", "");
    assert_eq!(eval_local(Arc::new(fs), Path::new("/r"), "link"), EvaluateResult::False);
}

#[test]
fn unknown_existence_is_indeterminate() {
    let fs = MockFileSystem::new();
    fs.add_file("/r/locked", "");
    fs.fail_with("/r/locked", io::ErrorKind::PermissionDenied);
    assert_eq!(
        eval_local(Arc::new(fs), Path::new("/r"), "locked"),
        EvaluateResult::Indeterminate
    );
}

#[test]
fn real_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.txt"), b"").unwrap();
    fs::write(dir.path().join("full.txt"), b"content").unwrap();
    let real: Arc<dyn watchquery::fs::FileSystem> = Arc::new(RealFileSystem);

    assert_eq!(
        eval_local(Arc::clone(&real), dir.path(), "empty.txt"),
        EvaluateResult::True
    );
    assert_eq!(
        eval_local(Arc::clone(&real), dir.path(), "full.txt"),
        EvaluateResult::False
    );
    assert_eq!(
        eval_local(Arc::clone(&real), dir.path(), "missing.txt"),
        EvaluateResult::False
    );
}

#[test]
fn missing_entry_kind_follows_policy() {
    let fs = MockFileSystem::new();
    fs.add_dir("/r");
    let fs: Arc<dyn watchquery::fs::FileSystem> = Arc::new(fs);

    let mut assumed = LocalFileState::new(
        Path::new("/r"),
        "gone",
        ClockValue::new(1, SystemTime::now()),
        Arc::clone(&fs),
        LocalFileStateOptions::default(),
    );
    let mut unknown = LocalFileState::new(
        Path::new("/r"),
        "gone",
        ClockValue::new(1, SystemTime::now()),
        fs,
        LocalFileStateOptions {
            missing_entry: watchquery::types::MissingEntryPolicy::Unknown,
            ..Default::default()
        },
    );

    use watchquery::file::FileState;
    assert_eq!(assumed.stat().map(|s| s.kind), Some(FileKind::File));
    assert_eq!(unknown.stat(), None);
    // Existence is known either way.
    assert_eq!(unknown.exists(), Some(false));
}
