//! Static-file cache tier: one JSON document per key under a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::debug;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::tier::{CacheError, CacheTier};

pub struct StaticFileTier {
    root: PathBuf,
    write_seq: AtomicU64,
}

impl StaticFileTier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        let namespace = match key.namespace() {
            "" => "default",
            ns => ns,
        };
        self.root
            .join(namespace)
            .join(format!("{}.json", key.digest()))
    }
}

fn backend(err: std::io::Error) -> CacheError {
    CacheError::Backend(err.to_string())
}

#[async_trait]
impl CacheTier for StaticFileTier {
    fn name(&self) -> &'static str {
        "static_file"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<String>>, CacheError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(backend(err)),
        };

        let entry: CacheEntry<String> = serde_json::from_slice(&raw)?;
        if entry.is_expired() {
            debug!("Removing expired cache file {}", path.display());
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != ErrorKind::NotFound {
                    return Err(backend(err));
                }
            }
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Writes to a temporary sibling and renames it into place, so readers
    /// never see a half-written document.
    async fn set(&self, key: &CacheKey, entry: CacheEntry<String>) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(backend)?;
        }

        let body = serde_json::to_vec(&entry)?;
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        tokio::fs::write(&tmp, body).await.map_err(backend)?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(backend(err));
        }
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(backend(err)),
        }
    }
}
