//! Persisted per-tag sync queues.
//!
//! Each tag is one JSON file under the queue directory holding the pending
//! items in arrival order; `registrations.json` lists tags with a pending
//! sync trigger. Writes go through a temp file and a rename.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::cache::StorageError;
use crate::models::{SyncItem, SyncTag};

const REGISTRATIONS_FILE: &str = "registrations.json";

pub struct SyncQueue {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the queue files
    lock: Mutex<()>,
}

impl SyncQueue {
    pub async fn new(dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn queue_path(&self, tag: SyncTag) -> PathBuf {
        self.dir.join(format!("{}.json", tag.as_str()))
    }

    fn registrations_path(&self) -> PathBuf {
        self.dir.join(REGISTRATIONS_FILE)
    }

    async fn load<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
        match fs::read(path).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let contents = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Append a payload to the tag's queue.
    pub async fn enqueue(&self, tag: SyncTag, payload: serde_json::Value) -> Result<SyncItem, StorageError> {
        let _guard = self.lock.lock().await;
        let path = self.queue_path(tag);
        let mut items: Vec<SyncItem> = Self::load(&path).await?;
        let item = SyncItem::new(payload);
        items.push(item.clone());
        Self::save(&path, &items).await?;
        debug!(tag = %tag, id = %item.id, pending = items.len(), "Sync item queued");
        Ok(item)
    }

    pub async fn pending(&self, tag: SyncTag) -> Result<Vec<SyncItem>, StorageError> {
        let _guard = self.lock.lock().await;
        Self::load(&self.queue_path(tag)).await
    }

    pub async fn len(&self, tag: SyncTag) -> Result<usize, StorageError> {
        Ok(self.pending(tag).await?.len())
    }

    pub async fn is_empty(&self, tag: SyncTag) -> Result<bool, StorageError> {
        Ok(self.len(tag).await? == 0)
    }

    /// Remove exactly the given items. Items queued after they were read stay.
    pub async fn remove(&self, tag: SyncTag, ids: &[Uuid]) -> Result<usize, StorageError> {
        let _guard = self.lock.lock().await;
        let path = self.queue_path(tag);
        let mut items: Vec<SyncItem> = Self::load(&path).await?;
        let before = items.len();
        items.retain(|item| !ids.contains(&item.id));
        let removed = before - items.len();
        if removed > 0 {
            Self::save(&path, &items).await?;
        }
        Ok(removed)
    }

    /// Record that the tag should be flushed on the next connectivity trigger.
    pub async fn register(&self, tag: SyncTag) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let path = self.registrations_path();
        let mut tags: BTreeSet<SyncTag> = Self::load(&path).await?;
        if tags.insert(tag) {
            Self::save(&path, &tags).await?;
        }
        Ok(())
    }

    /// Drop the tag's registration unless items are still queued for it.
    /// Returns whether the registration was dropped. Checked under the same
    /// lock as `enqueue`, so an item queued concurrently keeps it alive.
    pub async fn unregister_if_empty(&self, tag: SyncTag) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let items: Vec<SyncItem> = Self::load(&self.queue_path(tag)).await?;
        if !items.is_empty() {
            return Ok(false);
        }
        let path = self.registrations_path();
        let mut tags: BTreeSet<SyncTag> = Self::load(&path).await?;
        if tags.remove(&tag) {
            Self::save(&path, &tags).await?;
        }
        Ok(true)
    }

    pub async fn registered(&self) -> Result<Vec<SyncTag>, StorageError> {
        let _guard = self.lock.lock().await;
        let tags: BTreeSet<SyncTag> = Self::load(&self.registrations_path()).await?;
        Ok(tags.into_iter().collect())
    }
}
