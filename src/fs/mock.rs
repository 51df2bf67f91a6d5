// src/fs/mock.rs

use super::{DirEntryInfo, FileSystem};
use crate::file::{FileInformation, FileKind};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Clone)]
struct MockNode {
    entry: MockEntry,
    modified: SystemTime,
}

/// In-memory filesystem with probe counters and injectable failures.
///
/// Clones share state, so a test can keep a handle while the code under test
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<HashMap<PathBuf, MockNode>>>,
    failures: Arc<Mutex<HashMap<PathBuf, io::ErrorKind>>>,
    stat_calls: Arc<AtomicUsize>,
    read_dir_calls: Arc<AtomicUsize>,
    read_link_calls: Arc<AtomicUsize>,
    open_calls: Arc<AtomicUsize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert(path.as_ref(), MockEntry::Symlink(target.into()));
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.lock().unwrap();
        nodes.retain(|p, _| !p.starts_with(path));
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        if let Some(node) = self.nodes.lock().unwrap().get_mut(path.as_ref()) {
            node.modified = modified;
        }
    }

    /// Make every probe of `path` fail with `kind` (until cleared).
    pub fn fail_with(&self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), kind);
    }

    pub fn clear_failure(&self, path: impl AsRef<Path>) {
        self.failures.lock().unwrap().remove(path.as_ref());
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }

    pub fn read_dir_calls(&self) -> usize {
        self.read_dir_calls.load(Ordering::SeqCst)
    }

    pub fn read_link_calls(&self) -> usize {
        self.read_link_calls.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut nodes = self.nodes.lock().unwrap();
        // Parents exist implicitly.
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(MockNode {
                entry: MockEntry::Dir,
                modified: SystemTime::UNIX_EPOCH,
            });
        }
        nodes.insert(
            path.to_path_buf(),
            MockNode {
                entry,
                modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
            },
        );
    }

    fn injected_failure(&self, path: &Path) -> Option<io::Error> {
        self.failures
            .lock()
            .unwrap()
            .get(path)
            .map(|kind| io::Error::new(*kind, format!("injected failure for {path:?}")))
    }

    fn info_of(node: &MockNode) -> FileInformation {
        let (kind, size) = match &node.entry {
            MockEntry::File(content) => (FileKind::File, content.len() as u64),
            MockEntry::Dir => (FileKind::Dir, 0),
            MockEntry::Symlink(target) => (FileKind::Symlink, target.as_os_str().len() as u64),
        };
        FileInformation {
            kind,
            size,
            mode: 0o644,
            accessed: Some(node.modified),
            modified: Some(node.modified),
            changed: Some(node.modified),
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {path:?}"))
    }
}

impl FileSystem for MockFileSystem {
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileInformation> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_failure(path) {
            return Err(err);
        }
        let nodes = self.nodes.lock().unwrap();
        nodes
            .get(path)
            .map(Self::info_of)
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.read_link_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_failure(path) {
            return Err(err);
        }
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path).map(|n| &n.entry) {
            Some(MockEntry::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {path:?}"),
            )),
            None => Err(Self::not_found(path)),
        }
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_failure(path) {
            return Err(err);
        }
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path).map(|n| &n.entry) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {path:?}"),
            )),
            None => Err(Self::not_found(path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        // Tests use absolute paths throughout.
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        self.read_dir_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_failure(path) {
            return Err(err);
        }
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path).map(|n| &n.entry) {
            Some(MockEntry::Dir) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {path:?}"),
                ));
            }
            None => return Err(Self::not_found(path)),
        }

        let failures = self.failures.lock().unwrap();
        let mut entries: Vec<DirEntryInfo> = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_os_string();
                let info = match failures.get(p) {
                    Some(kind) => Err(io::Error::new(*kind, "injected failure")),
                    None => Ok(Self::info_of(node)),
                };
                Some(DirEntryInfo { name, info })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
