use tracing::{debug, warn};
use url::Url;

use crate::events::WorkerEvent;
use crate::models::notification::EXPLORE_ACTION;
use crate::models::Notification;

use super::OfflineCacheManager;

/// What the host should do after a notification click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Close the notification and open (or focus) this URL.
    OpenWindow(Url),
    /// Close the notification only.
    Close,
}

impl OfflineCacheManager {
    /// Show a notification for a push message. Returns what was shown, or
    /// `None` if the payload was unusable or the notifier failed.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Option<Notification> {
        let text = match data.map(std::str::from_utf8) {
            None => "",
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!(error = %e, "Ignoring push payload that is not UTF-8");
                return None;
            }
        };

        let notification = Notification::from_push_text(
            text,
            &self.config.notification_icon,
            &self.config.notification_badge,
        );

        if let Err(e) = self.notifier.show(&notification).await {
            warn!(error = %e, "Failed to show notification");
            return None;
        }

        self.events
            .publish(WorkerEvent::NotificationShown(notification.clone()));
        Some(notification)
    }

    /// The primary action, or a click on the body, opens the app root.
    pub fn handle_notification_click(&self, action: Option<&str>) -> ClickOutcome {
        match action {
            None | Some("") | Some(EXPLORE_ACTION) => {
                let root = self.origin.join("/").unwrap_or_else(|_| self.origin.clone());
                debug!(url = %root, "Notification click opens app");
                ClickOutcome::OpenWindow(root)
            }
            Some(other) => {
                debug!(action = other, "Notification dismissed");
                ClickOutcome::Close
            }
        }
    }
}
