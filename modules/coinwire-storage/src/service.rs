//! The versioned storage facade.
//!
//! Writes fan out to every backend in registration order, collecting
//! per-backend failures into one joined error. Reads fan in and return the
//! first usable result. Registration order differs by role and the
//! asymmetry is load-bearing: the read service is cache-first
//! (redis, mysql, elastic), the write service is source-of-truth-first
//! (mysql, redis, elastic) so the relational row exists before cache
//! population.

use std::collections::HashMap;
use std::sync::Arc;

use coinwire_common::config::Config;
use coinwire_common::Article;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::elastic::ElasticStorage;
use crate::error::{FanoutError, Result, StorageError};
use crate::mysql::MysqlStorage;
use crate::redis::RedisStorage;
use crate::strategy::Strategy;

pub struct Service {
    backends: Vec<Arc<dyn Strategy>>,
}

impl Service {
    pub fn new(backends: Vec<Arc<dyn Strategy>>) -> Self {
        Self { backends }
    }

    /// Write-side service for a scrape run, tagged with the run version.
    /// Backend order: mysql, redis, elastic.
    pub async fn for_writes(config: &Config, version: i64) -> Result<Self> {
        info!(version, "Initializing write service");
        let mysql = MysqlStorage::connect(&config.mysql).await?;
        let redis = RedisStorage::connect(&config.redis, version, config.storage.retention).await?;
        let elastic =
            ElasticStorage::connect(&config.elastic, version, config.storage.retention).await?;
        Ok(Self::new(vec![
            Arc::new(mysql),
            Arc::new(redis),
            Arc::new(elastic),
        ]))
    }

    /// Read-side service pinned to the last published version.
    /// Backend order: redis, mysql, elastic.
    pub async fn for_reads(config: &Config) -> Result<Self> {
        let redis = RedisStorage::connect(&config.redis, 0, config.storage.retention).await?;
        let version = redis.get_version().await.unwrap_or(0);
        info!(version, "Initializing read service");

        let mysql = MysqlStorage::connect(&config.mysql).await?;
        mysql.migrate().await?;
        let elastic =
            ElasticStorage::connect(&config.elastic, version, config.storage.retention).await?;
        Ok(Self::new(vec![
            Arc::new(redis),
            Arc::new(mysql),
            Arc::new(elastic),
        ]))
    }

    /// Switch every backend to a new active version.
    pub async fn set_version(&self, version: i64) {
        for backend in &self.backends {
            backend.set_version(version).await;
        }
    }

    // --- Fan-out writes ---

    pub async fn save(&self, article: &Article) -> std::result::Result<(), FanoutError> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            if let Err(e) = backend.save(article).await {
                warn!(backend = backend.name(), error = %e, "Backend save failed");
                failures.push((backend.name(), e));
            }
        }
        match FanoutError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub async fn save_coin(&self, article: &Article) -> std::result::Result<(), FanoutError> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            if let Err(e) = backend.save_coin(article).await {
                warn!(backend = backend.name(), error = %e, "Backend coin save failed");
                failures.push((backend.name(), e));
            }
        }
        match FanoutError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Retention sweep on every backend.
    pub async fn sweep(&self) -> std::result::Result<(), FanoutError> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            if let Err(e) = backend.sweep().await {
                warn!(backend = backend.name(), error = %e, "Backend sweep failed");
                failures.push((backend.name(), e));
            }
        }
        match FanoutError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // --- Fan-in reads ---

    pub async fn get(&self, token: &str) -> Result<Article> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.get(token).await {
                Ok(article) => return Ok(article),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn home_list(
        &self,
        category: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.home_list(category, page, size).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn read_list(
        &self,
        origins: &[String],
        category: &str,
    ) -> Result<HashMap<String, Vec<Article>>> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.read_list(origins, category).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Article>> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.list_by_category(category).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn list_by_origin(
        &self,
        origin: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.list_by_origin(origin, page, size).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn origins_by_category(&self, category: &str) -> Result<Vec<String>> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.origins_by_category(category).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    pub async fn search(
        &self,
        keyword: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let mut last = StorageError::NotImplemented;
        for backend in &self.backends {
            match backend.search(keyword, page, size).await {
                Ok(result) => return Ok(result),
                Err(e) => last = self.note(backend.name(), e),
            }
        }
        Err(last)
    }

    fn note(&self, backend: &'static str, e: StorageError) -> StorageError {
        if !matches!(e, StorageError::NotImplemented) {
            warn!(backend, error = %e, "Backend read failed, falling through");
        }
        e
    }
}

/// Handle for publishing a version change to the listening service.
#[derive(Clone)]
pub struct VersionNotifier {
    tx: mpsc::Sender<i64>,
}

impl VersionNotifier {
    pub async fn notify(&self, version: i64) {
        if self.tx.send(version).await.is_err() {
            warn!(version, "Version listener is gone, change not delivered");
        }
    }
}

/// Spawn the single listener that applies version changes to every backend
/// of `service`. The channel is buffered at capacity 1 to decouple the
/// publishing run from delivery.
pub fn version_listener(service: Arc<Service>) -> VersionNotifier {
    let (tx, mut rx) = mpsc::channel::<i64>(1);

    tokio::spawn(async move {
        while let Some(version) = rx.recv().await {
            service.set_version(version).await;
            info!(version, "Received version change");
        }
        info!("Version listener stopped");
    });

    VersionNotifier { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coinwire_common::Category;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    /// In-memory backend with knobs for capability and failure injection.
    struct FakeBackend {
        name: &'static str,
        implements_get: bool,
        fail_save: bool,
        version: AtomicI64,
        saved: AtomicBool,
    }

    impl FakeBackend {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                implements_get: true,
                fail_save: false,
                version: AtomicI64::new(0),
                saved: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Strategy for FakeBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn set_version(&self, version: i64) {
            self.version.store(version, Ordering::SeqCst);
        }

        async fn get(&self, token: &str) -> Result<Article> {
            if !self.implements_get {
                return Err(StorageError::NotImplemented);
            }
            let mut article = Article::new(self.name, Category::Latest);
            article.title = format!("from {}", self.name);
            article.token = token.to_string();
            article.link = "https://example.com".to_string();
            Ok(article)
        }

        async fn save(&self, _article: &Article) -> Result<()> {
            if self.fail_save {
                return Err(StorageError::Search("injected".into()));
            }
            self.saved.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn article() -> Article {
        let mut article = Article::new("coindesk", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();
        article.link = "https://example.com".to_string();
        article
    }

    #[tokio::test]
    async fn fan_in_skips_not_implemented_backends() {
        let mut first = FakeBackend::new("first");
        first.implements_get = false;
        let second = FakeBackend::new("second");

        let service = Service::new(vec![Arc::new(first), Arc::new(second)]);
        let found = service.get("abc").await.unwrap();
        assert_eq!(found.title, "from second");
    }

    #[tokio::test]
    async fn fan_in_errors_when_no_backend_answers() {
        let mut only = FakeBackend::new("only");
        only.implements_get = false;
        let service = Service::new(vec![Arc::new(only)]);
        assert!(matches!(
            service.get("abc").await,
            Err(StorageError::NotImplemented)
        ));
    }

    #[tokio::test]
    async fn fan_out_commits_survivors_and_joins_failures() {
        let ok_one = Arc::new(FakeBackend::new("one"));
        let mut failing = FakeBackend::new("two");
        failing.fail_save = true;
        let failing = Arc::new(failing);
        let ok_three = Arc::new(FakeBackend::new("three"));

        let service = Service::new(vec![ok_one.clone(), failing, ok_three.clone()]);
        let err = service.save(&article()).await.unwrap_err();

        // The cause set is exactly the failing backends.
        let causes: Vec<&str> = err.failures.iter().map(|(name, _)| *name).collect();
        assert_eq!(causes, vec!["two"]);
        // The other backends still committed.
        assert!(ok_one.saved.load(Ordering::SeqCst));
        assert!(ok_three.saved.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fan_out_is_ok_when_all_backends_commit() {
        let service = Service::new(vec![
            Arc::new(FakeBackend::new("one")),
            Arc::new(FakeBackend::new("two")),
        ]);
        assert!(service.save(&article()).await.is_ok());
    }

    #[tokio::test]
    async fn version_broadcast_reaches_every_backend() {
        let one = Arc::new(FakeBackend::new("one"));
        let two = Arc::new(FakeBackend::new("two"));
        let service = Arc::new(Service::new(vec![one.clone(), two.clone()]));

        let notifier = version_listener(service);
        notifier.notify(1722470400).await;

        // One notification delivery later, every backend has the version.
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            loop {
                if one.version.load(Ordering::SeqCst) == 1722470400
                    && two.version.load(Ordering::SeqCst) == 1722470400
                {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("version change was not applied");
    }
}
