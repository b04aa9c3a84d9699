//! Persisted lifecycle state: which cache version is active, which one is
//! installed and waiting.
//!
//! Stored as `registration.json` in the data directory so a host that
//! restarts keeps serving the previously activated version.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::cache::StorageError;

/// Registration file name in the data directory
const REGISTRATION_FILE: &str = "registration.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    pub active_version: Option<String>,
    pub waiting_version: Option<String>,
    pub installed_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl RegistrationData {
    /// Record a successfully installed version as waiting.
    pub fn set_waiting(&mut self, version: &str) {
        self.waiting_version = Some(version.to_string());
        self.installed_at = Some(Utc::now());
    }

    /// Promote the waiting version to active. Returns the new active version.
    pub fn promote(&mut self) -> Option<String> {
        let version = self.waiting_version.take()?;
        self.active_version = Some(version.clone());
        self.activated_at = Some(Utc::now());
        Some(version)
    }
}

pub struct Registration {
    data_dir: PathBuf,
    pub data: RegistrationData,
}

impl Registration {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data: RegistrationData::default(),
        }
    }

    /// Load from disk. Returns whether a saved registration existed.
    pub async fn load(&mut self) -> Result<bool, StorageError> {
        match fs::read(self.path()).await {
            Ok(contents) => {
                self.data = serde_json::from_slice(&contents)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `change` to a copy of the data and persist it. The in-memory
    /// state is only replaced once the write has succeeded.
    pub async fn update<T>(&mut self, change: impl FnOnce(&mut RegistrationData) -> T) -> Result<T, StorageError> {
        let mut next = self.data.clone();
        let result = change(&mut next);
        self.write(&next).await?;
        self.data = next;
        Ok(result)
    }

    async fn write(&self, data: &RegistrationData) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).await?;
        let contents = serde_json::to_vec_pretty(data)?;
        let path = self.path();
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn active_version(&self) -> Option<&str> {
        self.data.active_version.as_deref()
    }

    pub fn waiting_version(&self) -> Option<&str> {
        self.data.waiting_version.as_deref()
    }

    fn path(&self) -> PathBuf {
        self.data_dir.join(REGISTRATION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_moves_waiting_to_active() {
        let mut data = RegistrationData::default();
        assert_eq!(data.promote(), None);

        data.set_waiting("v2");
        assert_eq!(data.waiting_version.as_deref(), Some("v2"));
        assert_eq!(data.promote(), Some("v2".to_string()));
        assert_eq!(data.active_version.as_deref(), Some("v2"));
        assert_eq!(data.waiting_version, None);
        assert!(data.activated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = Registration::new(dir.path().to_path_buf());
        assert!(!reg.load().await.unwrap());

        reg.update(|data| data.set_waiting("v1")).await.unwrap();
        let promoted = reg.update(RegistrationData::promote).await.unwrap();
        assert_eq!(promoted.as_deref(), Some("v1"));

        let mut loaded = Registration::new(dir.path().to_path_buf());
        assert!(loaded.load().await.unwrap());
        assert_eq!(loaded.data, reg.data);
        assert_eq!(loaded.active_version(), Some("v1"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = Registration::new(dir.path().to_path_buf());
        reg.update(|data| data.set_waiting("v1")).await.unwrap();

        // A directory in place of the file makes the rename fail
        let path = dir.path().join(REGISTRATION_FILE);
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        assert!(reg.update(RegistrationData::promote).await.is_err());
        assert_eq!(reg.waiting_version(), Some("v1"));
        assert_eq!(reg.active_version(), None);
    }
}
