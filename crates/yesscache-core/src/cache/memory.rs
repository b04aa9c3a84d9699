use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Response;

use super::error::validate_name;
use super::{CacheStorage, CachedResponse, StorageError};

type Partition = BTreeMap<String, CachedResponse>;

/// Process-local partitions. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    partitions: RwLock<BTreeMap<String, Partition>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        self.partitions
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.partitions.read().await.contains_key(name))
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.partitions.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.partitions.write().await.remove(name).is_some())
    }

    async fn match_in(&self, name: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        Ok(self
            .partitions
            .read()
            .await
            .get(name)
            .and_then(|partition| partition.get(url))
            .cloned())
    }

    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), StorageError> {
        validate_name(name)?;
        self.partitions
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(url.to_string(), CachedResponse::new(url, response.clone()));
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), StorageError> {
        validate_name(name)?;
        // One write lock for the whole batch
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(name.to_string()).or_default();
        for (url, response) in entries {
            let cached = CachedResponse::new(url.clone(), response);
            partition.insert(url, cached);
        }
        Ok(())
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .partitions
            .read()
            .await
            .get(name)
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default())
    }
}
