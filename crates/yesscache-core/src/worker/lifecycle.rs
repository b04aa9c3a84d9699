//! Install and activation.
//!
//! Install fetches the whole static manifest before touching storage, so a
//! single failed file leaves no partition behind and the previously active
//! version keeps serving. Activation removes every partition that does not
//! belong to the configured version, then claims open pages.

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::events::WorkerEvent;
use crate::models::{Request, Response};
use crate::registration::RegistrationData;

use super::{OfflineCacheManager, WorkerError};

/// Maximum concurrent manifest downloads during install.
const MAX_CONCURRENT_INSTALL_FETCHES: usize = 6;

impl OfflineCacheManager {
    /// Precache the static manifest for the configured version.
    ///
    /// On success the version is recorded as waiting; call
    /// [`activate`](Self::activate) (or send `SKIP_WAITING`) to switch over.
    pub async fn install(&self) -> Result<(), WorkerError> {
        let version = self.config.cache_version.clone();
        info!(version = %version, files = self.config.static_manifest.len(), "Installing");

        let mut requests = Vec::with_capacity(self.config.static_manifest.len());
        for path in &self.config.static_manifest {
            let url = self.config.resolve(path).map_err(WorkerError::Config)?;
            requests.push(Request::get(url));
        }

        let results: Vec<(String, Result<Response, crate::api::ApiError>)> = stream::iter(requests)
            .map(|request| async move {
                let result = self.fetcher.fetch(&request).await;
                (request.cache_key(), result)
            })
            .buffered(MAX_CONCURRENT_INSTALL_FETCHES)
            .collect()
            .await;

        let mut entries = Vec::with_capacity(results.len());
        for (url, result) in results {
            match result {
                Ok(response) if response.is_success() => entries.push((url, response)),
                Ok(response) => {
                    return Err(self.install_failed(&version, format!("{} returned status {}", url, response.status)));
                }
                Err(e) => {
                    return Err(self.install_failed(&version, format!("{}: {}", url, e)));
                }
            }
        }

        if let Err(e) = self
            .storage
            .put_all(&self.config.static_cache_name(), entries)
            .await
        {
            return Err(self.install_failed(&version, format!("failed to store manifest: {}", e)));
        }

        self.registration
            .lock()
            .await
            .update(|data| data.set_waiting(&version))
            .await?;

        info!(version = %version, "Installed, waiting to activate");
        self.events.publish(WorkerEvent::Installed { version });
        Ok(())
    }

    fn install_failed(&self, version: &str, reason: String) -> WorkerError {
        warn!(version, reason = %reason, "Install aborted");
        self.events.publish(WorkerEvent::InstallFailed {
            version: version.to_string(),
            reason: reason.clone(),
        });
        WorkerError::Install {
            version: version.to_string(),
            reason,
        }
    }

    /// Activate the waiting version: delete stale partitions, then claim
    /// every open page. Returns the now-active version.
    pub async fn activate(&self) -> Result<String, WorkerError> {
        let mut registration = self.registration.lock().await;

        let waiting = registration
            .waiting_version()
            .ok_or(WorkerError::NothingWaiting)?
            .to_string();
        if waiting != self.config.cache_version {
            return Err(WorkerError::VersionMismatch {
                waiting,
                configured: self.config.cache_version.clone(),
            });
        }

        let current = [self.config.static_cache_name(), self.config.dynamic_cache_name()];
        for name in self.storage.keys().await? {
            if current.contains(&name) {
                continue;
            }
            // A failed delete aborts so the next activation retries the cleanup
            if let Err(e) = self.storage.delete(&name).await {
                error!(partition = %name, error = %e, "Failed to delete stale partition");
                return Err(e.into());
            }
            info!(partition = %name, "Deleted stale partition");
            self.events.publish(WorkerEvent::PartitionDeleted { name });
        }

        let version = registration
            .update(RegistrationData::promote)
            .await?
            .ok_or(WorkerError::NothingWaiting)?;
        drop(registration);

        info!(version = %version, "Activated");
        self.events.publish(WorkerEvent::Activated {
            version: version.clone(),
        });
        self.claim(&version);
        Ok(version)
    }

    /// Take control of every open page without waiting for a reload.
    fn claim(&self, version: &str) {
        let pages = self.events.publish(WorkerEvent::ClientsClaimed {
            version: version.to_string(),
        });
        info!(version, subscribers = pages, "Clients claimed");
    }

    pub async fn active_version(&self) -> Option<String> {
        self.registration.lock().await.data.active_version.clone()
    }

    pub async fn waiting_version(&self) -> Option<String> {
        self.registration.lock().await.data.waiting_version.clone()
    }
}
