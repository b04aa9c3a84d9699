//! Versioned response caches.
//!
//! This module provides the [`CacheStorage`] trait, a set of named
//! partitions each mapping a request URL to a captured response, and two
//! implementations:
//! - [`DiskStorage`]: one directory per partition, one JSON file per entry
//! - [`MemoryStorage`]: process-local, for tests and ephemeral hosts
//!
//! Partition names carry the cache version (`yessplora-static-v3`), so
//! activating a new version is a matter of deleting every other name.

pub mod disk;
pub mod error;
pub mod memory;
pub mod storage;

pub use disk::DiskStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, CachedResponse};
