// src/file/hash.rs

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 digest of a file's contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash the contents of a single file.
pub fn compute_content_hash(fs: &dyn FileSystem, path: &Path) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    let mut reader = fs.open_read(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash(*hasher.finalize().as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    size: u64,
    modified: SystemTime,
}

/// Root-wide cache of content hashes.
///
/// An entry is reused only while the file's size and mtime still match what
/// they were when it was hashed, so a changed file is re-hashed without any
/// explicit invalidation. Files without a known mtime are never cached.
#[derive(Debug, Default)]
pub struct ContentHashCache {
    hashes: Mutex<HashMap<PathBuf, (CacheKey, ContentHash)>>,
}

impl ContentHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the hash for a file, computing and caching it if necessary.
    pub fn get_or_compute(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        size: u64,
        modified: Option<SystemTime>,
    ) -> io::Result<ContentHash> {
        let Some(modified) = modified else {
            return compute_content_hash(fs, path);
        };
        let key = CacheKey { size, modified };
        if let Some((cached_key, hash)) = self.lock().get(path) {
            if *cached_key == key {
                return Ok(*hash);
            }
        }

        debug!("cache miss: computing hash for {:?}", path);
        let hash = compute_content_hash(fs, path)?;
        self.lock().insert(path.to_path_buf(), (key, hash));
        Ok(hash)
    }

    /// Drop the cached hash for a file (e.g. on removal).
    pub fn invalidate(&self, path: &Path) {
        if self.lock().remove(path).is_some() {
            debug!("invalidated hash cache for {:?}", path);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, (CacheKey, ContentHash)>> {
        // A poisoned map still holds valid hashes.
        self.hashes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::time::Duration;

    #[test]
    fn hashes_known_content() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/test.txt", b"hello world".to_vec());

        let hash = compute_content_hash(&fs, Path::new("/r/test.txt")).unwrap();
        // blake3 hash of "hello world"
        assert_eq!(
            hash.to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn cache_reuses_until_metadata_changes() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/a", "one");
        let cache = ContentHashCache::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let path = Path::new("/r/a");

        let first = cache.get_or_compute(&fs, path, 3, Some(t0)).unwrap();
        let again = cache.get_or_compute(&fs, path, 3, Some(t0)).unwrap();
        assert_eq!(first, again);
        assert_eq!(fs.open_calls(), 1);

        fs.add_file("/r/a", "two!");
        let changed = cache
            .get_or_compute(&fs, path, 4, Some(t0 + Duration::from_secs(1)))
            .unwrap();
        assert_ne!(first, changed);
        assert_eq!(fs.open_calls(), 2);
    }

    #[test]
    fn unknown_mtime_is_never_cached() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/a", "one");
        let cache = ContentHashCache::new();
        let path = Path::new("/r/a");

        let first = cache.get_or_compute(&fs, path, 3, None).unwrap();
        fs.add_file("/r/a", "two");
        let second = cache.get_or_compute(&fs, path, 3, None).unwrap();
        assert_ne!(first, second);
        assert!(cache.is_empty());
    }
}
