//! Display of push notifications.
//!
//! The host platform owns the notification tray; the cache manager only
//! builds the [`Notification`] and hands it over through [`Notifier`].

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::models::Notification;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log. Used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            body = %notification.body,
            actions = notification.actions.len(),
            "Notification shown"
        );
        Ok(())
    }
}
