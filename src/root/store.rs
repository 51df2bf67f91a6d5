// src/root/store.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::{ClockValue, RootClock};
use crate::file::{FileInformation, FileRecord};

/// What a change did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// First sighting, or reappearance after removal.
    Created,
    Modified,
    Removed,
    /// Nothing recorded: outside the root, the root itself, or a removal of
    /// something never seen.
    Ignored,
}

/// Everything the root knows, keyed by path relative to the root.
///
/// Removed entries stay in the store (with `exists = false`) so incremental
/// queries can report them.
///
/// Updates draw their tick from the root clock while holding the write lock,
/// and [`snapshot_as_of`](Self::snapshot_as_of) reads the clock under the read
/// lock. Every tick a snapshot's clock covers is therefore already in that
/// snapshot.
#[derive(Debug, Default)]
pub struct FileStore {
    records: RwLock<HashMap<PathBuf, FileRecord>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, name: &Path) -> Option<FileRecord> {
        self.read().get(name).cloned()
    }

    /// Copy of every record, ordered by name.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self.read().values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Copy of every record together with the clock they are current as of.
    pub fn snapshot_as_of(&self, clock: &RootClock) -> (ClockValue, Vec<FileRecord>) {
        let records = self.read();
        let now = clock.current();
        let mut records: Vec<FileRecord> = records.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        (now, records)
    }

    /// Record that `name` exists with `info`, stamped with a fresh tick.
    pub fn upsert(
        &self,
        name: &Path,
        info: FileInformation,
        symlink_target: Option<PathBuf>,
        clock: &RootClock,
    ) -> ChangeKind {
        let mut records = self.write();
        let clock = clock.tick();
        match records.get_mut(name) {
            Some(record) if record.exists => {
                record.info = Some(info);
                record.symlink_target = symlink_target;
                record.observed = clock;
                ChangeKind::Modified
            }
            Some(record) => {
                record.exists = true;
                record.info = Some(info);
                record.symlink_target = symlink_target;
                record.created = clock;
                record.observed = clock;
                ChangeKind::Created
            }
            None => {
                records.insert(
                    name.to_path_buf(),
                    FileRecord {
                        name: name.to_path_buf(),
                        exists: true,
                        info: Some(info),
                        symlink_target,
                        created: clock,
                        observed: clock,
                    },
                );
                ChangeKind::Created
            }
        }
    }

    /// Mark `name` and everything below it as removed, all with one tick.
    /// Returns how many records changed; no tick is taken when none did.
    pub fn mark_removed(&self, name: &Path, clock: &RootClock) -> usize {
        let mut records = self.write();
        let mut stamp = None;
        let mut removed = 0;
        for (path, record) in records.iter_mut() {
            if record.exists && path.starts_with(name) {
                record.exists = false;
                record.observed = *stamp.get_or_insert_with(|| clock.tick());
                removed += 1;
            }
        }
        removed
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, FileRecord>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, FileRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKind;

    fn info(kind: FileKind) -> FileInformation {
        FileInformation {
            kind,
            ..FileInformation::deleted()
        }
    }

    #[test]
    fn create_modify_remove_recreate() {
        let store = FileStore::new();
        let clock = RootClock::new();
        let name = Path::new("a.txt");

        assert_eq!(store.upsert(name, info(FileKind::File), None, &clock), ChangeKind::Created);
        assert_eq!(store.upsert(name, info(FileKind::File), None, &clock), ChangeKind::Modified);
        let record = store.get(name).unwrap();
        assert_eq!(record.created.ticks, 1);
        assert_eq!(record.observed.ticks, 2);

        assert_eq!(store.mark_removed(name, &clock), 1);
        let record = store.get(name).unwrap();
        assert!(!record.exists);
        assert_eq!(record.observed.ticks, 3);

        assert_eq!(store.upsert(name, info(FileKind::File), None, &clock), ChangeKind::Created);
        assert_eq!(store.get(name).unwrap().created.ticks, 4);
    }

    #[test]
    fn removing_a_directory_removes_descendants() {
        let store = FileStore::new();
        let clock = RootClock::new();
        store.upsert(Path::new("dir"), info(FileKind::Dir), None, &clock);
        store.upsert(Path::new("dir/a"), info(FileKind::File), None, &clock);
        store.upsert(Path::new("dir/sub/b"), info(FileKind::File), None, &clock);
        store.upsert(Path::new("dirx"), info(FileKind::File), None, &clock);

        assert_eq!(store.mark_removed(Path::new("dir"), &clock), 3);
        assert_eq!(store.get(Path::new("dir/a")).unwrap().observed.ticks, 5);
        assert_eq!(store.get(Path::new("dir/sub/b")).unwrap().observed.ticks, 5);
        assert!(store.get(Path::new("dirx")).unwrap().exists);
        // Already removed entries are not counted twice, and cost no tick.
        assert_eq!(store.mark_removed(Path::new("dir"), &clock), 0);
        assert_eq!(clock.current().ticks, 5);
    }

    #[test]
    fn snapshot_is_sorted() {
        let store = FileStore::new();
        let clock = RootClock::new();
        store.upsert(Path::new("b"), info(FileKind::File), None, &clock);
        store.upsert(Path::new("a"), info(FileKind::File), None, &clock);
        let names: Vec<_> = store.snapshot().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn snapshot_clock_covers_exactly_the_applied_updates() {
        let store = FileStore::new();
        let clock = RootClock::new();
        store.upsert(Path::new("a"), info(FileKind::File), None, &clock);
        // A tick taken elsewhere (e.g. on delivery) is covered without a record.
        clock.tick();

        let (as_of, records) = store.snapshot_as_of(&clock);
        assert_eq!(as_of.ticks, 2);
        assert!(records.iter().all(|r| r.observed <= as_of));

        store.upsert(Path::new("b"), info(FileKind::File), None, &clock);
        assert!(store.get(Path::new("b")).unwrap().observed > as_of);
    }
}
