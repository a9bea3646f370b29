//! Content-Addressed Bytecode Cache
//!
//! Two tiers keyed by [`CacheKey`]:
//!
//! | Tier       | Lifetime          | Storage                         |
//! |------------|-------------------|---------------------------------|
//! | Memory     | Process           | `FxHashMap<CacheKey, Arc<[u8]>>` |
//! | Persistent | Across processes  | `<cache_dir>/<hex key>.spv`     |
//!
//! Lookups hit memory first; a persistent hit is promoted into memory. Writes
//! go to both tiers. Persistent-tier I/O failures are logged and otherwise
//! ignored: an artifact that could not be written stays valid for the rest of
//! the session from memory, and an unreadable entry is just a miss.
//!
//! The only fatal cache error is failing to create the cache directory in
//! [`ShaderCache::new`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

use super::ShaderStage;
use crate::errors::{Result, ShaderPackError};
use crate::settings::CACHE_EXTENSION;

// ─── Cache Key ────────────────────────────────────────────────────────────────

/// SHA-256 digest identifying one compiled artifact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derives the key of a shader from its identity and **final** source.
    ///
    /// `source` must be the post-preprocessing, post-conversion text so that
    /// a change to any include or to the converter invalidates the entry.
    #[must_use]
    pub fn derive(name: &str, source: &str, stage: ShaderStage, pack_version: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(source.as_bytes());
        hasher.update(stage.tag().as_bytes());
        hasher.update(pack_version.as_bytes());
        Self(hasher.finalize().into())
    }

    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters. Used as the persistent file stem.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.to_hex())
    }
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub memory_count: usize,
    pub persistent_count: usize,
    /// Total size of all persistent entries.
    pub total_bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory: {}, Disk: {}, Size: {:.2} MB",
            self.memory_count,
            self.persistent_count,
            self.total_bytes as f64 / 1024.0 / 1024.0
        )
    }
}

// ─── Shader Cache ─────────────────────────────────────────────────────────────

/// Two-tier bytecode cache. Shared through an `Arc`; all methods take `&self`.
pub struct ShaderCache {
    dir: PathBuf,
    memory: Mutex<FxHashMap<CacheKey, Arc<[u8]>>>,
}

impl ShaderCache {
    /// Opens (creating if needed) the cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ShaderPackError::CacheInit {
            path: dir.clone(),
            source,
        })?;
        info!("Shader cache directory: {}", dir.display());

        Ok(Self {
            dir,
            memory: Mutex::new(FxHashMap::default()),
        })
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persistent location of `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{CACHE_EXTENSION}", key.to_hex()))
    }

    /// Looks `key` up in memory, then on disk. Disk hits are promoted.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[u8]>> {
        if let Some(bytes) = self.memory.lock().get(key) {
            return Some(Arc::clone(bytes));
        }

        let path = self.entry_path(key);
        let bytes: Arc<[u8]> = match fs::read(&path) {
            Ok(bytes) => bytes.into(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(source) => {
                warn!("{}", ShaderPackError::CacheIo { path, source });
                return None;
            }
        };

        self.memory.lock().insert(*key, Arc::clone(&bytes));
        Some(bytes)
    }

    /// Stores `bytes` in both tiers. Never fails; disk errors are logged.
    pub fn put(&self, key: CacheKey, bytes: impl Into<Arc<[u8]>>) {
        let bytes = bytes.into();
        let path = self.entry_path(&key);

        match fs::write(&path, &bytes) {
            Ok(()) => debug!("Cached shader: {key}"),
            Err(source) => warn!("{}", ShaderPackError::CacheIo { path, source }),
        }

        self.memory.lock().insert(key, bytes);
    }

    /// Drops the memory tier only. The next `get` of each key reads from disk.
    pub fn evict_memory(&self) {
        self.memory.lock().clear();
    }

    /// Empties memory and deletes every persistent entry.
    ///
    /// An entry that cannot be deleted is logged and skipped; the rest are
    /// still removed.
    pub fn clear(&self) {
        self.memory.lock().clear();

        let entries = match self.entry_paths() {
            Ok(entries) => entries,
            Err(source) => {
                warn!(
                    "{}",
                    ShaderPackError::CacheIo {
                        path: self.dir.clone(),
                        source
                    }
                );
                return;
            }
        };

        let mut removed = 0usize;
        for path in entries {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(source) => warn!("{}", ShaderPackError::CacheIo { path, source }),
            }
        }

        info!("Shader cache cleared ({removed} entries removed)");
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let memory_count = self.memory.lock().len();

        let entries = self.persistent_entries().unwrap_or_else(|source| {
            warn!(
                "{}",
                ShaderPackError::CacheIo {
                    path: self.dir.clone(),
                    source
                }
            );
            Vec::new()
        });

        let total_bytes = entries
            .iter()
            .map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            .sum();

        CacheStats {
            memory_count,
            persistent_count: entries.len(),
            total_bytes,
        }
    }

    fn persistent_entries(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = self.entry_paths()?;
        entries.retain(|path| path.is_file());
        Ok(entries)
    }

    /// Every `.spv` path in the cache directory, regular file or not.
    fn entry_paths(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(CACHE_EXTENSION))
            {
                entries.push(path);
            }
        }
        Ok(entries)
    }
}

impl fmt::Debug for ShaderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderCache")
            .field("dir", &self.dir)
            .field("memory_count", &self.memory.lock().len())
            .finish()
    }
}
