// src/file/mod.rs

//! Per-file state as seen by one query pass.
//!
//! A [`FileState`] is created when a file is matched by a query and thrown
//! away once the result has been rendered. Two implementations exist:
//!
//! - [`InMemoryFileState`]: a snapshot of what the root's store already knows.
//!   Accessors are cheap and do no I/O (except content hashing).
//! - [`LocalFileState`]: knows only a path; every accessor may be the first
//!   touch of the filesystem. Outcomes are cached for the lifetime of the
//!   instance and [`FileState::batch_fetch_properties`] primes many instances
//!   with one directory listing per parent directory.
//!
//! Every accessor returns `None` for "unknown". Callers must treat that as
//! unknown, not as false/zero.
//!
//! # Thread safety
//!
//! Accessors take `&mut self` because first access fills a cache. An
//! instance is meant to be used from one thread at a time over its whole
//! lifetime; different instances may be evaluated on different threads.

pub mod hash;
pub mod in_memory;
pub mod info;
pub mod local;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::clock::ClockValue;

pub use crate::types::MissingEntryPolicy;

pub use hash::{ContentHash, ContentHashCache, compute_content_hash};
pub use in_memory::{FileRecord, InMemoryFileState};
pub use info::{FileInformation, FileKind};
pub use local::{LocalFileState, LocalFileStateOptions};

/// Capability set shared by every file state variant.
pub trait FileState {
    /// Path relative to the root, as matched.
    fn name(&self) -> &Path;

    fn exists(&mut self) -> Option<bool>;
    fn stat(&mut self) -> Option<FileInformation>;
    fn accessed_time(&mut self) -> Option<SystemTime>;
    fn modified_time(&mut self) -> Option<SystemTime>;
    fn changed_time(&mut self) -> Option<SystemTime>;
    fn size(&mut self) -> Option<u64>;
    /// Symlink target. `None` for non-symlinks and failed reads alike.
    fn read_link(&mut self) -> Option<PathBuf>;
    fn content_hash(&mut self) -> Option<ContentHash>;
    /// Clock at which the file was first known to exist.
    fn created_clock(&mut self) -> Option<ClockValue>;
    /// Clock at which the file's state was last confirmed.
    fn observed_clock(&mut self) -> Option<ClockValue>;

    /// Name of the file within its directory. `None` if it isn't valid
    /// UTF-8.
    fn base_name(&self) -> Option<&str> {
        match self.name().file_name() {
            Some(name) => name.to_str(),
            None => Some(""),
        }
    }

    /// Containing directory relative to the root (`""` at top level). `None`
    /// if it isn't valid UTF-8.
    fn dir_name(&self) -> Option<&str> {
        match self.name().parent() {
            Some(parent) => parent.to_str(),
            None => Some(""),
        }
    }

    /// Front-load expensive probes for a batch of same-variant instances.
    ///
    /// Must not reorder or drop entries, and must not fail as a whole: an
    /// entry whose probe failed just stays unknown. Doing nothing is always
    /// correct.
    fn batch_fetch_properties(_files: &mut [Self])
    where
        Self: Sized,
    {
    }
}

impl<F: FileState + ?Sized> FileState for Box<F> {
    fn name(&self) -> &Path {
        (**self).name()
    }
    fn exists(&mut self) -> Option<bool> {
        (**self).exists()
    }
    fn stat(&mut self) -> Option<FileInformation> {
        (**self).stat()
    }
    fn accessed_time(&mut self) -> Option<SystemTime> {
        (**self).accessed_time()
    }
    fn modified_time(&mut self) -> Option<SystemTime> {
        (**self).modified_time()
    }
    fn changed_time(&mut self) -> Option<SystemTime> {
        (**self).changed_time()
    }
    fn size(&mut self) -> Option<u64> {
        (**self).size()
    }
    fn read_link(&mut self) -> Option<PathBuf> {
        (**self).read_link()
    }
    fn content_hash(&mut self) -> Option<ContentHash> {
        (**self).content_hash()
    }
    fn created_clock(&mut self) -> Option<ClockValue> {
        (**self).created_clock()
    }
    fn observed_clock(&mut self) -> Option<ClockValue> {
        (**self).observed_clock()
    }
    fn base_name(&self) -> Option<&str> {
        (**self).base_name()
    }
    fn dir_name(&self) -> Option<&str> {
        (**self).dir_name()
    }
}
