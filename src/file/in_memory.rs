// src/file/in_memory.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::clock::ClockValue;
use crate::file::{ContentHash, ContentHashCache, FileInformation, FileState};
use crate::fs::FileSystem;

/// What the root's store knows about one path.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path relative to the root.
    pub name: PathBuf,
    pub exists: bool,
    /// Last known metadata. Kept after removal so renderers can still show
    /// what the file looked like.
    pub info: Option<FileInformation>,
    pub symlink_target: Option<PathBuf>,
    pub created: ClockValue,
    pub observed: ClockValue,
}

/// File state backed by a store record snapshot.
///
/// The snapshot is taken when the file is matched; later store updates are
/// not visible through this instance.
#[derive(Debug)]
pub struct InMemoryFileState {
    record: FileRecord,
    full_path: PathBuf,
    fs: Arc<dyn FileSystem>,
    hashes: Arc<ContentHashCache>,
    content_hash: Option<Option<ContentHash>>,
}

impl InMemoryFileState {
    pub fn new(
        record: FileRecord,
        root: &Path,
        fs: Arc<dyn FileSystem>,
        hashes: Arc<ContentHashCache>,
    ) -> Self {
        let full_path = root.join(&record.name);
        Self {
            record,
            full_path,
            fs,
            hashes,
            content_hash: None,
        }
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    fn compute_content_hash(&self) -> Option<ContentHash> {
        if !self.record.exists {
            return None;
        }
        let info = self.record.info.as_ref()?;
        if !info.is_file() {
            return None;
        }
        match self
            .hashes
            .get_or_compute(self.fs.as_ref(), &self.full_path, info.size, info.modified)
        {
            Ok(hash) => Some(hash),
            Err(err) => {
                debug!(path = ?self.full_path, %err, "content hash unavailable");
                None
            }
        }
    }
}

impl FileState for InMemoryFileState {
    fn name(&self) -> &Path {
        &self.record.name
    }

    fn exists(&mut self) -> Option<bool> {
        Some(self.record.exists)
    }

    fn stat(&mut self) -> Option<FileInformation> {
        self.record.info.clone()
    }

    fn accessed_time(&mut self) -> Option<SystemTime> {
        self.record.info.as_ref().and_then(|i| i.accessed)
    }

    fn modified_time(&mut self) -> Option<SystemTime> {
        self.record.info.as_ref().and_then(|i| i.modified)
    }

    fn changed_time(&mut self) -> Option<SystemTime> {
        self.record.info.as_ref().and_then(|i| i.changed)
    }

    fn size(&mut self) -> Option<u64> {
        self.record.info.as_ref().map(|i| i.size)
    }

    fn read_link(&mut self) -> Option<PathBuf> {
        self.record.symlink_target.clone()
    }

    fn content_hash(&mut self) -> Option<ContentHash> {
        if let Some(cached) = self.content_hash {
            return cached;
        }
        let hash = self.compute_content_hash();
        self.content_hash = Some(hash);
        hash
    }

    fn created_clock(&mut self) -> Option<ClockValue> {
        Some(self.record.created)
    }

    fn observed_clock(&mut self) -> Option<ClockValue> {
        Some(self.record.observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKind;
    use crate::fs::mock::MockFileSystem;

    fn record(name: &str, exists: bool, info: Option<FileInformation>) -> FileRecord {
        let clock = ClockValue::new(3, SystemTime::UNIX_EPOCH);
        FileRecord {
            name: PathBuf::from(name),
            exists,
            info,
            symlink_target: None,
            created: clock,
            observed: clock,
        }
    }

    fn file_info(size: u64) -> FileInformation {
        FileInformation {
            kind: FileKind::File,
            size,
            ..FileInformation::deleted()
        }
    }

    #[test]
    fn accessors_reflect_the_record_without_io() {
        let fs = MockFileSystem::new();
        let mut state = InMemoryFileState::new(
            record("src/lib.rs", true, Some(file_info(12))),
            Path::new("/r"),
            Arc::new(fs.clone()),
            Arc::new(ContentHashCache::new()),
        );

        assert_eq!(state.exists(), Some(true));
        assert_eq!(state.size(), Some(12));
        assert_eq!(state.base_name(), Some("lib.rs"));
        assert_eq!(state.dir_name(), Some("src"));
        assert_eq!(state.created_clock().map(|c| c.ticks), Some(3));
        assert_eq!(fs.stat_calls(), 0);
    }

    #[test]
    fn content_hash_is_computed_once_per_instance() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/a.txt", "abc");
        let mut state = InMemoryFileState::new(
            record("a.txt", true, Some(file_info(3))),
            Path::new("/r"),
            Arc::new(fs.clone()),
            Arc::new(ContentHashCache::new()),
        );

        let first = state.content_hash();
        assert!(first.is_some());
        assert_eq!(state.content_hash(), first);
        assert_eq!(fs.open_calls(), 1);
    }

    #[test]
    fn removed_file_has_no_content_hash() {
        let fs = MockFileSystem::new();
        let mut state = InMemoryFileState::new(
            record("gone.txt", false, Some(file_info(3))),
            Path::new("/r"),
            Arc::new(fs.clone()),
            Arc::new(ContentHashCache::new()),
        );
        assert_eq!(state.exists(), Some(false));
        assert_eq!(state.content_hash(), None);
        assert_eq!(fs.open_calls(), 0);
    }
}
