// src/file/info.rs

use std::fs::Metadata;
use std::time::SystemTime;

/// Entry classification as reported by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl FileKind {
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_dir() {
            FileKind::Dir
        } else if ft.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        }
    }
}

/// Stat-equivalent metadata for one entry. Never follows symlinks.
///
/// A timestamp the platform or filesystem does not report is `None`, which
/// predicates treat as unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInformation {
    pub kind: FileKind,
    pub size: u64,
    pub mode: u32,
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub changed: Option<SystemTime>,
}

impl FileInformation {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            kind: FileKind::from_file_type(meta.file_type()),
            size: meta.len(),
            mode: mode_of(meta),
            accessed: meta.accessed().ok(),
            modified: meta.modified().ok(),
            changed: changed_of(meta),
        }
    }

    /// Placeholder record for an entry that does not exist.
    ///
    /// Zeroed out, but classified as a regular file. Only valid for
    /// producers that never list directories (source-control listings); see
    /// [`MissingEntryPolicy`](crate::file::MissingEntryPolicy).
    pub fn deleted() -> Self {
        Self {
            kind: FileKind::File,
            size: 0,
            mode: 0,
            accessed: Some(SystemTime::UNIX_EPOCH),
            modified: Some(SystemTime::UNIX_EPOCH),
            changed: Some(SystemTime::UNIX_EPOCH),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o644 }
}

#[cfg(unix)]
fn changed_of(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    Some(SystemTime::UNIX_EPOCH + Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn changed_of(_meta: &Metadata) -> Option<SystemTime> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_times_are_taken_as_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let info = FileInformation::from_metadata(&std::fs::symlink_metadata(&path).unwrap());
        assert_eq!(info.size, 1);
        assert!(info.modified.is_some());
        #[cfg(unix)]
        assert!(info.changed.is_some());
        #[cfg(not(unix))]
        assert_eq!(info.changed, None);
    }
}
