use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named background sync tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyncTag {
    /// QR codes scanned while offline.
    #[serde(rename = "sync-qr-scans")]
    QrScans,
    /// Levels completed while offline.
    #[serde(rename = "sync-level-completions")]
    LevelCompletions,
}

impl SyncTag {
    pub const ALL: [SyncTag; 2] = [SyncTag::QrScans, SyncTag::LevelCompletions];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::QrScans => "sync-qr-scans",
            SyncTag::LevelCompletions => "sync-level-completions",
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSyncTag(pub String);

impl fmt::Display for UnknownSyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sync tag: {}", self.0)
    }
}

impl std::error::Error for UnknownSyncTag {}

impl FromStr for SyncTag {
    type Err = UnknownSyncTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownSyncTag(s.to_string()))
    }
}

/// A payload waiting for server acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub queued_at: DateTime<Utc>,
}

impl SyncItem {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            queued_at: Utc::now(),
        }
    }
}
