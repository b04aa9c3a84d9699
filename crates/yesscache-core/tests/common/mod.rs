// Shared by several test binaries; not every helper is used by each
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use yesscache_core::{
    ApiError, CacheStorage, CachedResponse, Config, Fetcher, MemoryStorage, Notification, Notifier,
    OfflineCacheManager, Request, Response, StorageError, SyncQueue,
};

pub const ORIGIN: &str = "https://play.yessplora.app";

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

pub fn get(path: &str) -> Request {
    Request::parse("GET", &url(path)).unwrap()
}

pub fn config(version: &str) -> Config {
    Config {
        origin: ORIGIN.to_string(),
        cache_version: version.to_string(),
        static_manifest: vec![
            "/".to_string(),
            "/index.html".to_string(),
            "/manifest.json".to_string(),
        ],
        ..Config::default()
    }
}

enum Scripted {
    Respond(Response),
    Fail,
}

/// Network double: answers from a script, records every request.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<Request>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    pub fn respond(&self, path: &str, response: Response) {
        self.script
            .lock()
            .unwrap()
            .insert(url(path), Scripted::Respond(response));
    }

    pub fn ok(&self, path: &str, body: &str) {
        self.respond(path, Response::new(200).with_body(body));
    }

    pub fn fail(&self, path: &str) {
        self.script.lock().unwrap().insert(url(path), Scripted::Fail);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let target = url(path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.cache_key() == target)
            .count()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Offline("network disabled".to_string()));
        }
        match self.script.lock().unwrap().get(&request.cache_key()) {
            Some(Scripted::Respond(response)) => Ok(response.clone()),
            Some(Scripted::Fail) => Err(ApiError::Offline("scripted failure".to_string())),
            None => Ok(Response::new(404)),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

fn broken() -> StorageError {
    StorageError::Unavailable("quota exceeded".to_string())
}

#[async_trait]
impl CacheStorage for BrokenStorage {
    async fn open(&self, _name: &str) -> Result<(), StorageError> {
        Err(broken())
    }
    async fn has(&self, _name: &str) -> Result<bool, StorageError> {
        Err(broken())
    }
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Err(broken())
    }
    async fn delete(&self, _name: &str) -> Result<bool, StorageError> {
        Err(broken())
    }
    async fn match_in(&self, _name: &str, _url: &str) -> Result<Option<CachedResponse>, StorageError> {
        Err(broken())
    }
    async fn put(&self, _name: &str, _url: &str, _response: &Response) -> Result<(), StorageError> {
        Err(broken())
    }
    async fn put_all(&self, _name: &str, _entries: Vec<(String, Response)>) -> Result<(), StorageError> {
        Err(broken())
    }
    async fn entries(&self, _name: &str) -> Result<Vec<String>, StorageError> {
        Err(broken())
    }
}

pub struct Harness {
    pub manager: OfflineCacheManager,
    pub fetcher: Arc<ScriptedFetcher>,
    pub storage: Arc<dyn CacheStorage>,
    pub queue: Arc<SyncQueue>,
    pub notifier: Arc<RecordingNotifier>,
    pub data_dir: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub async fn new(config: Config) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new())).await
    }

    pub async fn with_storage(config: Config, storage: Arc<dyn CacheStorage>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();
        let queue = Arc::new(SyncQueue::new(data_dir.join("sync")).await.unwrap());
        let fetcher = Arc::new(ScriptedFetcher::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let manager = OfflineCacheManager::new(
            config,
            storage.clone(),
            fetcher.clone(),
            queue.clone(),
            notifier.clone(),
            data_dir.clone(),
        )
        .await
        .unwrap();

        Self {
            manager,
            fetcher,
            storage,
            queue,
            notifier,
            data_dir,
            _dir: dir,
        }
    }

    /// A manager for another version sharing this harness's storage,
    /// network, queue and registration.
    pub async fn manager_for(&self, config: Config) -> OfflineCacheManager {
        self.manager_with(config, self.storage.clone(), self.fetcher.clone())
            .await
    }

    /// A manager sharing this harness's queue and registration, with its
    /// own storage and network.
    pub async fn manager_with(
        &self,
        config: Config,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> OfflineCacheManager {
        OfflineCacheManager::new(
            config,
            storage,
            fetcher,
            self.queue.clone(),
            self.notifier.clone(),
            self.data_dir.clone(),
        )
        .await
        .unwrap()
    }

    /// Script the default manifest and run install + activate.
    pub async fn install_and_activate(&self) {
        self.fetcher.ok("/", "<html>root</html>");
        self.fetcher.ok("/index.html", "<html>index</html>");
        self.fetcher.ok("/manifest.json", r#"{"name":"YessPlora"}"#);
        self.manager.install().await.unwrap();
        self.manager.activate().await.unwrap();
    }
}
