//! Application configuration management.
//!
//! This module handles loading and saving the configuration of the offline
//! cache manager: the origin it serves, the cache version, the install
//! manifest, the route prefixes and the background sync endpoints.
//!
//! Configuration is stored at `~/.config/yesscache/config.json`. A few
//! fields can be overridden from the environment (see [`Config::apply_env`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::SyncTag;

/// Application name used for config/data directory paths
const APP_NAME: &str = "yesscache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_ORIGIN: &str = "YESSCACHE_ORIGIN";
pub const ENV_VERSION: &str = "YESSCACHE_VERSION";
pub const ENV_DATA_DIR: &str = "YESSCACHE_DATA_DIR";

/// Path prefixes and extensions used to classify requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub static_prefixes: Vec<String>,
    pub qr_prefixes: Vec<String>,
    pub api_prefixes: Vec<String>,
    /// Extensions (without the dot) treated as static assets when no prefix matches.
    pub static_extensions: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            static_prefixes: vec![
                "/static/".to_string(),
                "/assets/".to_string(),
                "/fonts/".to_string(),
                "/images/".to_string(),
                "/icons/".to_string(),
            ],
            qr_prefixes: vec!["/qr-codes/".to_string()],
            api_prefixes: vec!["/api/".to_string()],
            static_extensions: ["js", "css", "woff", "woff2", "ttf", "otf", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin the cache manager controls; other origins pass through.
    pub origin: String,
    /// Prefix of every partition name.
    pub cache_prefix: String,
    /// Version embedded in partition names. Bump to invalidate old caches.
    pub cache_version: String,
    /// Paths fetched and stored on install.
    pub static_manifest: Vec<String>,
    pub routes: RouteConfig,
    /// POST endpoint per background sync task.
    pub sync_endpoints: BTreeMap<SyncTag, String>,
    /// Dynamic-cache key under which pages prime offline data.
    pub offline_data_key: String,
    pub notification_icon: String,
    pub notification_badge: String,
    /// No timeout when unset.
    pub request_timeout_secs: Option<u64>,
    /// Overrides the platform cache directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut sync_endpoints = BTreeMap::new();
        sync_endpoints.insert(SyncTag::QrScans, "/api/sync/qr-scans".to_string());
        sync_endpoints.insert(SyncTag::LevelCompletions, "/api/sync/level-completions".to_string());

        Self {
            origin: "http://localhost:3000".to_string(),
            cache_prefix: "yessplora".to_string(),
            cache_version: "v1".to_string(),
            static_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192x192.png".to_string(),
                "/icons/icon-512x512.png".to_string(),
            ],
            routes: RouteConfig::default(),
            sync_endpoints,
            offline_data_key: "/offline-data".to_string(),
            notification_icon: "/icons/icon-192x192.png".to_string(),
            notification_badge: "/icons/badge-72x72.png".to_string(),
            request_timeout_secs: None,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `YESSCACHE_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup(ENV_ORIGIN) {
            self.origin = origin;
        }
        if let Some(version) = lookup(ENV_VERSION) {
            self.cache_version = version;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Directory holding cache partitions, the sync queue and the registration.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    /// Resolve an origin-relative path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin_url()?
            .join(path)
            .with_context(|| format!("Invalid path: {}", path))
    }

    pub fn static_cache_name(&self) -> String {
        self.static_cache_name_for(&self.cache_version)
    }

    pub fn dynamic_cache_name(&self) -> String {
        self.dynamic_cache_name_for(&self.cache_version)
    }

    pub fn static_cache_name_for(&self, version: &str) -> String {
        format!("{}-static-{}", self.cache_prefix, version)
    }

    pub fn dynamic_cache_name_for(&self, version: &str) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, version)
    }

    pub fn sync_endpoint(&self, tag: SyncTag) -> Result<Url> {
        let path = self
            .sync_endpoints
            .get(&tag)
            .ok_or_else(|| anyhow::anyhow!("No sync endpoint configured for {}", tag))?;
        self.resolve(path)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Check the fields that every operation relies on.
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        for name in [self.static_cache_name(), self.dynamic_cache_name()] {
            crate::cache::error::validate_name(&name)
                .with_context(|| format!("Cache prefix/version produce an invalid name: {}", name))?;
        }
        for path in &self.static_manifest {
            self.resolve(path)?;
        }
        for tag in SyncTag::ALL {
            self.sync_endpoint(tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_cache_names_embed_version() {
        let config = Config {
            cache_version: "v7".to_string(),
            ..Config::default()
        };
        assert_eq!(config.static_cache_name(), "yessplora-static-v7");
        assert_eq!(config.dynamic_cache_name(), "yessplora-dynamic-v7");
        assert_eq!(config.static_cache_name_for("v6"), "yessplora-static-v6");
    }

    #[test]
    fn test_resolve_against_origin() {
        let config = Config {
            origin: "https://play.yessplora.app".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.resolve("/index.html").unwrap().as_str(),
            "https://play.yessplora.app/index.html"
        );
        assert_eq!(
            config.sync_endpoint(SyncTag::QrScans).unwrap().as_str(),
            "https://play.yessplora.app/api/sync/qr-scans"
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_ORIGIN => Some("https://staging.yessplora.app".to_string()),
            ENV_VERSION => Some("v9".to_string()),
            _ => None,
        });
        assert_eq!(config.origin, "https://staging.yessplora.app");
        assert_eq!(config.cache_version, "v9");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_invalid_version_fails_validation() {
        let config = Config {
            cache_version: "v1/../../x".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            cache_version: "v3".to_string(),
            request_timeout_secs: Some(15),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"cache_version": "v4"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cache_version, "v4");
        assert_eq!(loaded.offline_data_key, "/offline-data");
    }
}
