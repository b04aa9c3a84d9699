use serde::{Deserialize, Serialize};

/// Action id of the primary notification button.
pub const EXPLORE_ACTION: &str = "explore";

/// Action id of the dismiss button.
pub const CLOSE_ACTION: &str = "close";

/// Title used for every push notification.
const NOTIFICATION_TITLE: &str = "YessPlora";

/// Body shown when a push arrives without text.
const DEFAULT_BODY: &str = "New adventure awaits!";

/// Vibration pattern in milliseconds (on, off, on).
const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for a push message body.
    pub fn from_push_text(text: &str, icon: &str, badge: &str) -> Self {
        let body = match text.trim() {
            "" => DEFAULT_BODY.to_string(),
            trimmed => trimmed.to_string(),
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body,
            icon: icon.to_string(),
            badge: badge.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.to_string(),
                    title: "Explore".to_string(),
                    icon: icon.to_string(),
                },
                NotificationAction {
                    action: CLOSE_ACTION.to_string(),
                    title: "Close".to_string(),
                    icon: icon.to_string(),
                },
            ],
        }
    }
}
