// src/root/crawl.rs

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::file::FileInformation;
use crate::fs::{FileSystem, is_not_found};

/// One entry found by [`walk`].
#[derive(Debug, Clone)]
pub struct CrawledEntry {
    /// Path relative to the root.
    pub name: PathBuf,
    pub info: FileInformation,
    pub symlink_target: Option<PathBuf>,
}

/// Walk `root.join(start)` depth-first, without following symlinks.
///
/// Failing to list `start` itself is an error. Below it, unreadable
/// directories and entries are logged and skipped, and anything that
/// vanished mid-walk is silently dropped.
pub fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    start: &Path,
    visit: &mut dyn FnMut(CrawledEntry),
) -> std::io::Result<usize> {
    let mut visited = 0usize;
    let mut stack = vec![start.to_path_buf()];
    let mut first = true;

    while let Some(dir) = stack.pop() {
        let full = if dir.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&dir)
        };
        let entries = match fs.read_dir(&full) {
            Ok(entries) => entries,
            Err(err) if first => return Err(err),
            Err(err) if is_not_found(&err) => continue,
            Err(err) => {
                warn!(path = ?full, %err, "skipping unreadable directory");
                continue;
            }
        };
        first = false;

        for entry in entries {
            let name = dir.join(&entry.name);
            let info = match entry.info {
                Ok(info) => info,
                Err(err) if is_not_found(&err) => continue,
                Err(err) => {
                    warn!(path = ?root.join(&name), %err, "skipping entry");
                    continue;
                }
            };

            let symlink_target = if info.is_symlink() {
                fs.read_link(&root.join(&name)).ok()
            } else {
                None
            };
            if info.is_dir() {
                stack.push(name.clone());
            }

            visit(CrawledEntry {
                name,
                info,
                symlink_target,
            });
            visited += 1;
        }
    }

    debug!(?root, ?start, visited, "crawl finished");
    Ok(visited)
}
