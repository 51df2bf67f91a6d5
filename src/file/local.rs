// src/file/local.rs

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::clock::ClockValue;
use crate::file::{
    ContentHash, FileInformation, FileState, MissingEntryPolicy, compute_content_hash,
};
use crate::fs::{FileSystem, is_not_found};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileStateOptions {
    pub case_sensitive: bool,
    pub missing_entry: MissingEntryPolicy,
}

impl Default for LocalFileStateOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            missing_entry: MissingEntryPolicy::AssumeRegularFile,
        }
    }
}

/// Outcome of the `lstat` probe.
#[derive(Debug, Clone)]
enum Presence {
    Present(FileInformation),
    Missing,
}

#[derive(Debug, Clone)]
enum Probe<T> {
    Pending,
    Resolved(T),
    /// The probe ran and failed with something other than "not found".
    Failed,
}

/// File state that learns about the file by probing the filesystem.
///
/// Nothing is shared beyond the lifetime of the instance. Within that
/// lifetime each probe runs at most once: the first outcome, failures
/// included, is what every later access sees.
#[derive(Debug)]
pub struct LocalFileState {
    name: PathBuf,
    full_path: PathBuf,
    clock: ClockValue,
    fs: Arc<dyn FileSystem>,
    options: LocalFileStateOptions,
    info: Probe<Presence>,
    symlink_target: Option<Option<PathBuf>>,
    content_hash: Option<Option<ContentHash>>,
}

impl LocalFileState {
    /// `name` is relative to `root`; `clock` is reported as both the created
    /// and observed clock.
    pub fn new(
        root: &Path,
        name: impl Into<PathBuf>,
        clock: ClockValue,
        fs: Arc<dyn FileSystem>,
        options: LocalFileStateOptions,
    ) -> Self {
        let name = name.into();
        let full_path = root.join(&name);
        Self {
            name,
            full_path,
            clock,
            fs,
            options,
            info: Probe::Pending,
            symlink_target: None,
            content_hash: None,
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    fn presence(&mut self) -> Option<&Presence> {
        if matches!(self.info, Probe::Pending) {
            self.info = probe_presence(self.fs.as_ref(), &self.full_path);
        }
        match &self.info {
            Probe::Resolved(presence) => Some(presence),
            Probe::Pending | Probe::Failed => None,
        }
    }

    fn present_info(&mut self) -> Option<&FileInformation> {
        match self.presence()? {
            Presence::Present(info) => Some(info),
            Presence::Missing => None,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.info, Probe::Pending)
    }
}

fn probe_presence(fs: &dyn FileSystem, path: &Path) -> Probe<Presence> {
    trace!(?path, "lstat");
    match fs.symlink_metadata(path) {
        Ok(info) => Probe::Resolved(Presence::Present(info)),
        Err(err) if is_not_found(&err) => Probe::Resolved(Presence::Missing),
        Err(err) => {
            debug!(?path, %err, "lstat failed; properties unknown");
            Probe::Failed
        }
    }
}

fn folded(name: &OsStr) -> OsString {
    OsString::from(name.to_string_lossy().to_lowercase())
}

impl FileState for LocalFileState {
    fn name(&self) -> &Path {
        &self.name
    }

    fn exists(&mut self) -> Option<bool> {
        match self.presence()? {
            Presence::Present(_) => Some(true),
            Presence::Missing => Some(false),
        }
    }

    fn stat(&mut self) -> Option<FileInformation> {
        let policy = self.options.missing_entry;
        match self.presence()? {
            Presence::Present(info) => Some(info.clone()),
            Presence::Missing => match policy {
                MissingEntryPolicy::AssumeRegularFile => Some(FileInformation::deleted()),
                MissingEntryPolicy::Unknown => None,
            },
        }
    }

    fn accessed_time(&mut self) -> Option<SystemTime> {
        self.present_info().and_then(|i| i.accessed)
    }

    fn modified_time(&mut self) -> Option<SystemTime> {
        self.present_info().and_then(|i| i.modified)
    }

    fn changed_time(&mut self) -> Option<SystemTime> {
        self.present_info().and_then(|i| i.changed)
    }

    fn size(&mut self) -> Option<u64> {
        self.present_info().map(|i| i.size)
    }

    fn read_link(&mut self) -> Option<PathBuf> {
        if let Some(cached) = &self.symlink_target {
            return cached.clone();
        }
        let is_symlink = self.present_info().is_some_and(|i| i.is_symlink());
        let target = if is_symlink {
            match self.fs.read_link(&self.full_path) {
                Ok(target) => Some(target),
                Err(err) => {
                    debug!(path = ?self.full_path, %err, "readlink failed");
                    None
                }
            }
        } else {
            None
        };
        self.symlink_target = Some(target.clone());
        target
    }

    fn content_hash(&mut self) -> Option<ContentHash> {
        if let Some(cached) = self.content_hash {
            return cached;
        }
        let is_file = self.present_info().is_some_and(|i| i.is_file());
        let hash = if is_file {
            match compute_content_hash(self.fs.as_ref(), &self.full_path) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    debug!(path = ?self.full_path, %err, "content hash unavailable");
                    None
                }
            }
        } else {
            None
        };
        self.content_hash = Some(hash);
        hash
    }

    fn created_clock(&mut self) -> Option<ClockValue> {
        Some(self.clock)
    }

    fn observed_clock(&mut self) -> Option<ClockValue> {
        Some(self.clock)
    }

    /// Resolve `lstat` for every pending instance with one directory listing
    /// per parent directory.
    fn batch_fetch_properties(files: &mut [Self]) {
        let mut by_dir: HashMap<PathBuf, Vec<usize>> = HashMap::new();
        for (idx, file) in files.iter().enumerate() {
            if !file.is_pending() || file.full_path.file_name().is_none() {
                continue;
            }
            if let Some(parent) = file.full_path.parent() {
                by_dir.entry(parent.to_path_buf()).or_default().push(idx);
            }
        }

        let dirs = by_dir.len();
        let mut resolved = 0usize;

        for (dir, indices) in by_dir {
            let fs = Arc::clone(&files[indices[0]].fs);
            match fs.read_dir(&dir) {
                Ok(entries) => {
                    // Entries are matched by exact name, the same way `lstat`
                    // resolves them. A case-only match is left to the
                    // instance's own lstat, which knows what the filesystem does.
                    let case_sensitive = files[indices[0]].options.case_sensitive;
                    let folded_names: HashSet<OsString> = if case_sensitive {
                        HashSet::new()
                    } else {
                        entries.iter().map(|e| folded(&e.name)).collect()
                    };
                    let listing: HashMap<OsString, io::Result<FileInformation>> =
                        entries.into_iter().map(|e| (e.name, e.info)).collect();

                    for idx in indices {
                        let file = &mut files[idx];
                        let Some(base) = file.full_path.file_name() else {
                            continue;
                        };
                        match listing.get(base) {
                            Some(Ok(info)) => {
                                file.info = Probe::Resolved(Presence::Present(info.clone()));
                                resolved += 1;
                            }
                            // Fall back to an individual probe on first access.
                            Some(Err(_)) => {}
                            None if folded_names.contains(&folded(base)) => {}
                            None => {
                                file.info = Probe::Resolved(Presence::Missing);
                                resolved += 1;
                            }
                        }
                    }
                }
                Err(err) if is_not_found(&err) => {
                    for idx in indices {
                        files[idx].info = Probe::Resolved(Presence::Missing);
                        resolved += 1;
                    }
                }
                Err(err) => {
                    debug!(?dir, %err, "directory listing failed; entries will be probed individually");
                }
            }
        }

        debug!(files = files.len(), dirs, resolved, "batch-fetched file properties");
    }
}
