//! Background sync: offline-originated writes waiting for connectivity.
//!
//! Pages enqueue payloads under a [`SyncTag`](crate::models::SyncTag) and
//! register the tag. When the host reports that connectivity is back, the
//! cache manager flushes each registered tag in one batch POST. Items leave
//! the queue only after the server answered 2xx (at-least-once delivery).

pub mod queue;

pub use queue::SyncQueue;

use serde::Serialize;

use crate::models::{SyncItem, SyncTag};

/// Body POSTed to a sync endpoint.
#[derive(Debug, Serialize)]
pub struct SyncBatch<'a> {
    pub tag: SyncTag,
    pub items: &'a [SyncItem],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was queued; no request made.
    Empty,
    /// Server acknowledged; sent items were removed.
    Delivered,
    /// Request failed or was rejected; queue left intact.
    Retained { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub tag: SyncTag,
    pub sent: usize,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    pub fn is_settled(&self) -> bool {
        !matches!(self.outcome, SyncOutcome::Retained { .. })
    }
}
