//! yesscache-core - offline cache manager for the YessPlora web app.
//!
//! This crate contains the offline layer: per-route caching strategies,
//! versioned cache partitions with install/activate lifecycle, the
//! background sync queue for offline-originated writes, and push
//! notification handling.
//!
//! The entry point is [`OfflineCacheManager`]. Hosts construct it with the
//! collaborators they want (or use [`OfflineCacheManager::open`] for the
//! disk + HTTP defaults) and forward events to it.

pub mod api;
pub mod cache;
pub mod config;
pub mod events;
pub mod models;
pub mod notify;
pub mod registration;
pub mod router;
pub mod sync;
pub mod worker;

pub use api::{ApiClient, ApiError, Fetcher};
pub use cache::{CacheStorage, CachedResponse, DiskStorage, MemoryStorage, StorageError};
pub use config::Config;
pub use events::{EventBus, Subscription, WorkerEvent};
pub use models::{Method, Notification, Request, Response, SyncItem, SyncTag};
pub use notify::{LogNotifier, Notifier};
pub use sync::{SyncOutcome, SyncQueue, SyncReport};
pub use worker::{
    CacheStatus, ClickOutcome, FetchOutcome, MessageOutcome, OfflineCacheManager, ResponseSource,
    WorkerError,
};
