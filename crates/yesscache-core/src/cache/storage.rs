use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Response;

use super::StorageError;

/// A response stored in a partition together with its key and write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, response: Response) -> Self {
        Self {
            url: url.into(),
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Negative ages come from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Named cache partitions keyed by request URL.
///
/// Each `put` is atomic for its key: a concurrent `match_in` sees either the
/// previous entry or the new one, never a partial write.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), StorageError>;

    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// Names of all partitions, sorted.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove a partition and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    async fn match_in(&self, name: &str, url: &str) -> Result<Option<CachedResponse>, StorageError>;

    /// Store (or overwrite) one entry, creating the partition if needed.
    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), StorageError>;

    /// Store a batch of entries. A new partition only becomes visible once
    /// every entry has been written.
    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), StorageError>;

    /// URLs stored in a partition, sorted. Empty if it does not exist.
    async fn entries(&self, name: &str) -> Result<Vec<String>, StorageError>;
}
