use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::Response;

use super::{Bucket, OfflineCacheManager, WorkerError};

/// Control messages posted by pages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting version now instead of on next load.
    SkipWaiting,
    /// Store an arbitrary JSON payload under the offline data key.
    CacheData { payload: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Activated(String),
    Cached,
    /// Malformed or inapplicable; nothing changed.
    Ignored,
}

impl OfflineCacheManager {
    /// Handle a raw message. Never fails: bad input is logged and ignored.
    pub async fn handle_message(&self, data: &[u8]) -> MessageOutcome {
        let message: ControlMessage = match serde_json::from_slice(data) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, bytes = data.len(), "Ignoring malformed control message");
                return MessageOutcome::Ignored;
            }
        };

        match self.apply_message(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Control message failed");
                MessageOutcome::Ignored
            }
        }
    }

    async fn apply_message(&self, message: ControlMessage) -> Result<MessageOutcome, WorkerError> {
        match message {
            ControlMessage::SkipWaiting => {
                if self.waiting_version().await.is_none() {
                    debug!("SKIP_WAITING with no waiting version");
                    return Ok(MessageOutcome::Ignored);
                }
                let version = self.activate().await?;
                Ok(MessageOutcome::Activated(version))
            }
            ControlMessage::CacheData { payload } => {
                let key = self
                    .config
                    .resolve(&self.config.offline_data_key)
                    .map_err(WorkerError::Config)?;
                let response = Response::json(200, &payload)
                    .map_err(|e| WorkerError::Storage(e.into()))?;
                let active = self
                    .active_partitions()
                    .await
                    .ok_or(WorkerError::NotActivated)?;
                self.storage
                    .put(active.name(Bucket::Dynamic), key.as_str(), &response)
                    .await?;
                info!(key = %key, "Offline data primed");
                Ok(MessageOutcome::Cached)
            }
        }
    }
}
