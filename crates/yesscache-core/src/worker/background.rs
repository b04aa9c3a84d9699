use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::ApiError;
use crate::events::WorkerEvent;
use crate::models::{Request, SyncItem, SyncTag};
use crate::sync::{SyncBatch, SyncOutcome, SyncReport};

use super::{OfflineCacheManager, WorkerError};

impl OfflineCacheManager {
    /// Queue a payload and register its tag for the next connectivity trigger.
    pub async fn enqueue(&self, tag: SyncTag, payload: serde_json::Value) -> Result<SyncItem, WorkerError> {
        let item = self.queue.enqueue(tag, payload).await?;
        self.register_sync(tag).await?;
        Ok(item)
    }

    pub async fn register_sync(&self, tag: SyncTag) -> Result<(), WorkerError> {
        self.queue.register(tag).await?;
        debug!(tag = %tag, "Sync registered");
        Ok(())
    }

    /// Connectivity is back: flush every registered tag. Tags whose flush
    /// failed, or that gained items while it ran, stay registered for the
    /// next trigger.
    pub async fn connectivity_restored(&self) -> Vec<SyncReport> {
        let tags = match self.queue.registered().await {
            Ok(tags) => tags,
            Err(e) => {
                error!(error = %e, "Failed to read sync registrations");
                return Vec::new();
            }
        };

        let mut reports = Vec::with_capacity(tags.len());
        for tag in tags {
            let report = self.sync(tag).await;
            if report.is_settled() {
                match self.queue.unregister_if_empty(tag).await {
                    Ok(true) => {}
                    Ok(false) => debug!(tag = %tag, "Items queued during sync, keeping registration"),
                    Err(e) => warn!(tag = %tag, error = %e, "Failed to clear sync registration"),
                }
            }
            reports.push(report);
        }
        reports
    }

    /// POST every pending item of `tag` in one batch. Items are removed only
    /// after a 2xx answer; anything else leaves the queue as it was.
    pub async fn sync(&self, tag: SyncTag) -> SyncReport {
        let items = match self.queue.pending(tag).await {
            Ok(items) => items,
            Err(e) => return self.retained(tag, 0, format!("failed to read queue: {}", e)),
        };
        if items.is_empty() {
            debug!(tag = %tag, "Nothing to sync");
            return SyncReport {
                tag,
                sent: 0,
                outcome: SyncOutcome::Empty,
            };
        }

        let sent = items.len();
        let request = match self
            .config
            .sync_endpoint(tag)
            .map_err(WorkerError::Config)
            .and_then(|url| {
                Request::post_json(url, &SyncBatch { tag, items: &items }).map_err(WorkerError::from)
            })
        {
            Ok(request) => request,
            Err(e) => return self.retained(tag, sent, e.to_string()),
        };

        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_success() => {
                let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
                if let Err(e) = self.queue.remove(tag, &ids).await {
                    // Delivered but still queued: the server will see them again
                    return self.retained(tag, sent, format!("acknowledged but not cleared: {}", e));
                }
                info!(tag = %tag, sent, "Sync delivered");
                self.events.publish(WorkerEvent::SyncCompleted { tag, sent });
                SyncReport {
                    tag,
                    sent,
                    outcome: SyncOutcome::Delivered,
                }
            }
            Ok(response) => {
                let rejected = ApiError::from_status(response.status, &response.text());
                self.retained(tag, sent, rejected.to_string())
            }
            Err(e) => self.retained(tag, sent, e.to_string()),
        }
    }

    fn retained(&self, tag: SyncTag, sent: usize, reason: String) -> SyncReport {
        warn!(tag = %tag, reason = %reason, "Sync failed, items kept for next trigger");
        self.events.publish(WorkerEvent::SyncFailed {
            tag,
            reason: reason.clone(),
        });
        SyncReport {
            tag,
            sent,
            outcome: SyncOutcome::Retained { reason },
        }
    }
}
