//! Fixed worker pool draining enriched articles into the storage facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use coinwire_common::Article;
use coinwire_storage::Service;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const WORKERS: usize = 5;
const QUEUE_DEPTH: usize = 256;

#[derive(Default)]
pub struct QueueStats {
    pub submitted: AtomicU64,
    pub success: AtomicU64,
    pub failure: AtomicU64,
    pub busy: AtomicU64,
}

impl QueueStats {
    /// Drained: nobody working and every submitted article accounted for.
    pub fn drained(&self) -> bool {
        self.busy.load(Ordering::SeqCst) == 0
            && self.success.load(Ordering::SeqCst) + self.failure.load(Ordering::SeqCst)
                == self.submitted.load(Ordering::SeqCst)
    }
}

pub struct SaveQueue {
    tx: mpsc::Sender<Article>,
    stats: Arc<QueueStats>,
    workers: Vec<JoinHandle<()>>,
}

impl SaveQueue {
    pub fn start(service: Arc<Service>, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Article>(QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(QueueStats::default());

        let handles = (0..workers)
            .map(|_| {
                let rx = rx.clone();
                let service = service.clone();
                let stats = stats.clone();
                tokio::spawn(worker(rx, service, stats))
            })
            .collect();

        Self {
            tx,
            stats,
            workers: handles,
        }
    }

    pub async fn submit(&self, article: Article) {
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(article).await.is_err() {
            self.stats.failure.fetch_add(1, Ordering::SeqCst);
            error!("Save queue is closed, article dropped");
        }
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        self.stats.clone()
    }

    /// Close the queue and wait until every submitted article is settled.
    pub async fn close_and_wait(self) {
        drop(self.tx);

        while !self.stats.drained() {
            info!(
                busy = self.stats.busy.load(Ordering::SeqCst),
                "Waiting for queue tasks to finish"
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        for handle in self.workers {
            let _ = handle.await;
        }

        info!(
            submitted = self.stats.submitted.load(Ordering::SeqCst),
            success = self.stats.success.load(Ordering::SeqCst),
            failure = self.stats.failure.load(Ordering::SeqCst),
            "Queue finished"
        );
    }
}

async fn worker(
    rx: Arc<Mutex<mpsc::Receiver<Article>>>,
    service: Arc<Service>,
    stats: Arc<QueueStats>,
) {
    loop {
        let article = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(mut article) = article else {
            break;
        };

        stats.busy.fetch_add(1, Ordering::SeqCst);
        article.token = article.gen_token();
        info!(title = %article.title, link = %article.link, "Saving article");

        let result = if article.is_coin() {
            service.save_coin(&article).await
        } else {
            service.save(&article).await
        };

        match result {
            Ok(()) => {
                stats.success.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                stats.failure.fetch_add(1, Ordering::SeqCst);
                error!(title = %article.title, error = %e, "Failed to save article");
            }
        }
        stats.busy.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coinwire_common::Category;
    use coinwire_storage::{Result as StorageResult, Strategy};

    #[derive(Default)]
    struct CountingBackend {
        saves: AtomicU64,
        coin_saves: AtomicU64,
    }

    #[async_trait]
    impl Strategy for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn save(&self, article: &Article) -> StorageResult<()> {
            assert!(!article.token.is_empty(), "token is assigned before save");
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn save_coin(&self, _article: &Article) -> StorageResult<()> {
            self.coin_saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn article(from: &str, title: &str) -> Article {
        let mut article = Article::new(from, Category::Latest);
        article.title = title.to_string();
        article.link = "https://example.com".to_string();
        article
    }

    #[tokio::test]
    async fn workers_route_coin_and_regular_saves() {
        let backend = Arc::new(CountingBackend::default());
        let service = Arc::new(Service::new(vec![backend.clone()]));

        let queue = SaveQueue::start(service, WORKERS);
        queue.submit(article("coindesk", "Bitcoin hits new high")).await;
        queue.submit(article("decrypt_coin", "Solana feed entry")).await;
        queue.submit(article("jinse", "另一条新闻")).await;

        let stats = queue.stats();
        queue.close_and_wait().await;

        assert_eq!(backend.saves.load(Ordering::SeqCst), 2);
        assert_eq!(backend.coin_saves.load(Ordering::SeqCst), 1);
        assert_eq!(stats.submitted.load(Ordering::SeqCst), 3);
        assert_eq!(stats.success.load(Ordering::SeqCst), 3);
        assert_eq!(stats.failure.load(Ordering::SeqCst), 0);
        assert!(stats.drained());
    }
}
