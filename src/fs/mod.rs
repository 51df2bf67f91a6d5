// src/fs/mod.rs

//! Filesystem probe seam.
//!
//! Everything that touches the disk to learn about a file goes through
//! [`FileSystem`], so probing behaviour (and how often it happens) can be
//! observed in tests with [`mock::MockFileSystem`].

use std::ffi::OsString;
use std::fmt::Debug;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::file::FileInformation;

pub mod mock;

/// One entry of a directory listing, with its `lstat` outcome.
#[derive(Debug)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub info: io::Result<FileInformation>,
}

/// Abstract filesystem interface.
///
/// Methods return `io::Result` rather than `anyhow::Result` because callers
/// branch on [`io::ErrorKind::NotFound`].
pub trait FileSystem: Send + Sync + Debug {
    /// `lstat`: metadata without following a trailing symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileInformation>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// List a directory together with the metadata of every entry.
    ///
    /// This is the batch primitive: one call here stands in for one
    /// `symlink_metadata` call per child.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileInformation> {
        fs::symlink_metadata(path).map(|meta| FileInformation::from_metadata(&meta))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(file))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            // DirEntry::metadata does not traverse symlinks.
            let info = entry
                .metadata()
                .map(|meta| FileInformation::from_metadata(&meta));
            entries.push(DirEntryInfo {
                name: entry.file_name(),
                info,
            });
        }
        Ok(entries)
    }
}

/// True for errors meaning "there is nothing at this path".
pub fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
