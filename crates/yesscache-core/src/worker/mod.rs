//! The offline cache manager.
//!
//! [`OfflineCacheManager`] is an explicitly constructed service: the host
//! hands it a [`Config`], a [`CacheStorage`], a [`Fetcher`], a
//! [`SyncQueue`] and a [`Notifier`], then forwards lifecycle events to it:
//!
//! - `install` / `activate` (see `lifecycle`)
//! - `handle_fetch` for every outgoing request (see `fetch`)
//! - `handle_message` for page control messages (see `message`)
//! - `handle_push` / `handle_notification_click` (see `push`)
//! - `connectivity_restored` for background sync (see `background`)
//!
//! Handlers take `&self` and can run concurrently; the only shared mutable
//! state is the registration, behind an async mutex.

mod background;
pub mod error;
mod fetch;
mod lifecycle;
mod message;
mod push;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::api::{ApiClient, Fetcher};
use crate::cache::{CacheStorage, CachedResponse, DiskStorage};
use crate::config::Config;
use crate::events::{EventBus, Subscription, WorkerEvent};
use crate::models::SyncTag;
use crate::notify::{LogNotifier, Notifier};
use crate::registration::Registration;
use crate::router::Router;
use crate::sync::SyncQueue;

pub use error::WorkerError;
pub use fetch::{FetchOutcome, ResponseSource};
pub use message::{ControlMessage, MessageOutcome};
pub use push::ClickOutcome;

/// Subdirectory of the data dir holding cache partitions.
const CACHES_DIR: &str = "caches";

/// Subdirectory of the data dir holding sync queues.
const SYNC_DIR: &str = "sync";

/// Snapshot of the manager's persistent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub configured_version: String,
    pub active_version: Option<String>,
    pub waiting_version: Option<String>,
    /// Partition name and entry count.
    pub partitions: Vec<(String, usize)>,
    /// Pending items per sync tag.
    pub queued: Vec<(SyncTag, usize)>,
    pub registered_syncs: Vec<SyncTag>,
}

/// Which of a version's two partitions an entry belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bucket {
    Static,
    Dynamic,
}

/// Partition names of the active version. Runtime reads and writes only
/// ever touch these, never a version that is merely configured or waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActivePartitions {
    static_name: String,
    dynamic_name: String,
}

impl ActivePartitions {
    pub(crate) fn name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Static => &self.static_name,
            Bucket::Dynamic => &self.dynamic_name,
        }
    }

    /// Lookup order: build-time assets, then runtime responses.
    pub(crate) fn search_order(&self) -> [&str; 2] {
        [&self.static_name, &self.dynamic_name]
    }
}

pub struct OfflineCacheManager {
    config: Config,
    origin: Url,
    router: Router,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    queue: Arc<SyncQueue>,
    notifier: Arc<dyn Notifier>,
    registration: Mutex<Registration>,
    events: EventBus<WorkerEvent>,
}

impl OfflineCacheManager {
    /// Build a manager from its collaborators and load the persisted
    /// registration from `registration_dir`.
    pub async fn new(
        config: Config,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        queue: Arc<SyncQueue>,
        notifier: Arc<dyn Notifier>,
        registration_dir: std::path::PathBuf,
    ) -> Result<Self, WorkerError> {
        config.validate().map_err(WorkerError::Config)?;
        let origin = config.origin_url().map_err(WorkerError::Config)?;

        let mut registration = Registration::new(registration_dir);
        let found = registration.load().await?;
        debug!(
            found,
            active = ?registration.active_version(),
            waiting = ?registration.waiting_version(),
            "Registration loaded"
        );

        Ok(Self {
            router: Router::new(&config.routes),
            origin,
            config,
            storage,
            fetcher,
            queue,
            notifier,
            registration: Mutex::new(registration),
            events: EventBus::new(),
        })
    }

    /// Build a manager with the production collaborators rooted at the
    /// configured data directory.
    pub async fn open(config: Config) -> Result<Self, WorkerError> {
        let data_dir = config.data_dir().map_err(WorkerError::Config)?;
        let storage = DiskStorage::new(data_dir.join(CACHES_DIR)).await?;
        let queue = SyncQueue::new(data_dir.join(SYNC_DIR)).await?;
        let fetcher = ApiClient::new(config.request_timeout())?;
        info!(data_dir = ?data_dir, version = %config.cache_version, "Opening offline cache manager");

        Self::new(
            config,
            Arc::new(storage),
            Arc::new(fetcher),
            Arc::new(queue),
            Arc::new(LogNotifier),
            data_dir,
        )
        .await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> Subscription<WorkerEvent> {
        self.events.subscribe()
    }

    pub(crate) async fn active_partitions(&self) -> Option<ActivePartitions> {
        let registration = self.registration.lock().await;
        let version = registration.active_version()?;
        Some(ActivePartitions {
            static_name: self.config.static_cache_name_for(version),
            dynamic_name: self.config.dynamic_cache_name_for(version),
        })
    }

    /// What the active version's caches hold for a URL, without touching
    /// the network.
    pub async fn cached(&self, url: &str) -> Result<Option<CachedResponse>, WorkerError> {
        let Some(active) = self.active_partitions().await else {
            return Ok(None);
        };
        for name in active.search_order() {
            if let Some(found) = self.storage.match_in(name, url).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub async fn status(&self) -> Result<CacheStatus, WorkerError> {
        let mut partitions = Vec::new();
        for name in self.storage.keys().await? {
            let count = self.storage.entries(&name).await?.len();
            partitions.push((name, count));
        }

        let mut queued = Vec::new();
        for tag in SyncTag::ALL {
            queued.push((tag, self.queue.len(tag).await?));
        }

        let registration = self.registration.lock().await;
        Ok(CacheStatus {
            configured_version: self.config.cache_version.clone(),
            active_version: registration.data.active_version.clone(),
            waiting_version: registration.data.waiting_version.clone(),
            partitions,
            queued,
            registered_syncs: self.queue.registered().await?,
        })
    }

    /// Stop publishing events. Subscribers drain what is buffered, then end.
    pub fn shutdown(&self) {
        info!("Offline cache manager shutting down");
        self.events.close();
    }
}
