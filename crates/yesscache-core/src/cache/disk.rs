//! File-backed cache partitions.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<partition>/<sha256(url)>.json
//! ```
//!
//! Entries are written to a temporary file and renamed into place so a
//! reader never observes a half-written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Response;

use super::error::validate_name;
use super::{CacheStorage, CachedResponse, StorageError};

/// Prefix of directories that hold a batch still being written.
const STAGING_PREFIX: &str = ".staging-";

/// Extension of committed entry files.
const ENTRY_EXTENSION: &str = "json";

pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        let storage = Self { root };
        storage.sweep_staging().await;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn entry_file_name(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION)
    }

    /// Remove batches left behind by an interrupted `put_all`.
    async fn sweep_staging(&self) {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(root = ?self.root, error = %e, "Failed to scan cache root");
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_PREFIX) {
                debug!(dir = ?name, "Removing abandoned staging directory");
                if let Err(e) = fs::remove_dir_all(entry.path()).await {
                    warn!(dir = ?name, error = %e, "Failed to remove staging directory");
                }
            }
        }
    }

    async fn write_entry(dir: &Path, url: &str, response: &Response) -> Result<(), StorageError> {
        let cached = CachedResponse::new(url, response.clone());
        let contents = serde_json::to_vec(&cached)?;
        let target = dir.join(Self::entry_file_name(url));
        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));

        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_entry(path: &Path) -> Result<Option<CachedResponse>, StorageError> {
        match fs::read(path).await {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(path: &Path) -> Result<bool, StorageError> {
        Ok(fs::try_exists(path).await?)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.partition_path(name)?).await?;
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Self::exists(&self.partition_path(name)?).await
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        match fs::remove_dir_all(self.partition_path(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_in(&self, name: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        let path = self.partition_path(name)?.join(Self::entry_file_name(url));
        Self::read_entry(&path).await
    }

    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), StorageError> {
        let dir = self.partition_path(name)?;
        fs::create_dir_all(&dir).await?;
        Self::write_entry(&dir, url, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), StorageError> {
        let target = self.partition_path(name)?;

        if Self::exists(&target).await? {
            for (url, response) in &entries {
                Self::write_entry(&target, url, response).await?;
            }
            return Ok(());
        }

        // Build the partition aside, then publish it with a single rename
        let staging = self.root.join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));
        fs::create_dir_all(&staging).await?;
        for (url, response) in &entries {
            if let Err(e) = Self::write_entry(&staging, url, response).await {
                let _ = fs::remove_dir_all(&staging).await;
                return Err(e);
            }
        }
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        debug!(partition = name, count = entries.len(), "Partition committed");
        Ok(())
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, StorageError> {
        let dir_path = self.partition_path(name)?;
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut urls = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(cached) = Self::read_entry(&path).await? {
                urls.push(cached.url);
            }
        }
        urls.sort();
        Ok(urls)
    }
}
