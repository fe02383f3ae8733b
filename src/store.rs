//! Keyed file stores for fetched artifacts and resources
//!
//! The resolver writes everything it fetches through a store so that the
//! local cache, not the resolver, owns the on-disk layout. Each entry
//! carries a last-access stamp; an external sweep pairs those stamps with
//! [`crate::retention::RetentionPolicy`] to decide what to delete. This
//! crate never performs that sweep.

use crate::error::{RepoError, Result};
use crate::metadata::ArtifactId;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Stable string form of a store key
pub trait StoreKey {
    fn store_key(&self) -> String;
}

impl StoreKey for String {
    fn store_key(&self) -> String {
        self.clone()
    }
}

impl StoreKey for ArtifactId {
    fn store_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.module.group,
            self.module.name,
            self.module.version,
            self.file_name()
        )
    }
}

/// Keyed content store
pub trait FileStore<K>: Send + Sync {
    /// Store `bytes` under `key`, returning the path written
    fn put(&self, key: &K, bytes: &[u8]) -> Result<PathBuf>;

    /// Read the content stored under `key`, if any
    fn get(&self, key: &K) -> Result<Option<Vec<u8>>>;
}

const DATA_FILE: &str = "data";
const ACCESS_STAMP: &str = ".last-access";

/// Filesystem store with hashed two-level fan-out directories
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for a key
    pub fn entry_dir(&self, key: &impl StoreKey) -> PathBuf {
        let hash = Self::hash_key(&key.store_key());
        self.root.join(&hash[..2]).join(&hash[2..])
    }

    /// When the entry for `key` was last read or written
    pub fn last_access(&self, key: &impl StoreKey) -> Result<Option<DateTime<Utc>>> {
        let stamp = self.entry_dir(key).join(ACCESS_STAMP);
        if !stamp.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&stamp)?;
        let parsed = DateTime::parse_from_rfc3339(text.trim())
            .map_err(|e| RepoError::Store(format!("corrupt access stamp: {}", e)))?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    /// Total size of stored content in bytes
    pub fn size(&self) -> Result<u64> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&self.root) {
            let entry = entry
                .map_err(|e| RepoError::Store(format!("failed to walk store directory: {}", e)))?;
            if entry.file_type().is_file() {
                total += entry
                    .metadata()
                    .map_err(|e| RepoError::Store(format!("failed to read metadata: {}", e)))?
                    .len();
            }
        }
        Ok(total)
    }

    fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn touch(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join(ACCESS_STAMP), Utc::now().to_rfc3339())?;
        Ok(())
    }
}

impl<K: StoreKey + Send + Sync> FileStore<K> for DirectoryStore {
    fn put(&self, key: &K, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.entry_dir(key);
        fs::create_dir_all(&dir)
            .map_err(|e| RepoError::Store(format!("failed to create store directory: {}", e)))?;
        let path = dir.join(DATA_FILE);
        fs::write(&path, bytes)?;
        self.touch(&dir)?;
        Ok(path)
    }

    fn get(&self, key: &K) -> Result<Option<Vec<u8>>> {
        let dir = self.entry_dir(key);
        let path = dir.join(DATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        self.touch(&dir)?;
        Ok(Some(bytes))
    }
}
