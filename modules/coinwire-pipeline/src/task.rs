//! One scrape run, source listing to snapshot publication.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use coinwire_common::{Article, Config};
use coinwire_scrape::sources::all_scrapers;
use coinwire_scrape::{ArticleSink, ImageSearcher};
use coinwire_storage::{Service, VersionNotifier};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dedup::TitleDedup;
use crate::queue::{SaveQueue, WORKERS};
use crate::translate::{apply_translation, needs_translation, Translator};

const CHANNEL_DEPTH: usize = 256;

pub struct ScrapeTask {
    config: Config,
    notifier: VersionNotifier,
}

impl ScrapeTask {
    pub fn new(config: Config, notifier: VersionNotifier) -> Self {
        Self { config, notifier }
    }

    /// Run one scrape. The version is published only if every source
    /// completes; a failed run leaves orphan data for the next sweep.
    pub async fn run(&self) -> Result<()> {
        info!("Starting scrape task");
        let version = Utc::now().timestamp();

        let service = Arc::new(
            Service::for_writes(&self.config, version)
                .await
                .context("Failed to initialize write service")?,
        );

        let translator = Arc::new(Translator::new(
            &self.config.kimi.key,
            &self.config.kimi.prompt,
        ));
        let dedup = Arc::new(TitleDedup::new(self.config.scrapy.threshold));
        let searcher = Arc::new(ImageSearcher::new(&self.config.scrapy.ua));
        let queue = SaveQueue::start(service.clone(), WORKERS);

        // adapters → intake → translation batcher → save queue
        let (article_tx, article_rx) = mpsc::channel::<Article>(CHANNEL_DEPTH);
        let (enrich_tx, enrich_rx) = mpsc::channel::<Article>(CHANNEL_DEPTH);

        let intake = tokio::spawn(intake_worker(article_rx, enrich_tx, searcher));
        let batcher = tokio::spawn(translate_worker(
            enrich_rx,
            translator,
            dedup,
            queue,
            self.config.kimi.tokens,
        ));

        // Sources run sequentially; each may fan out inner fetches itself.
        let sink = ArticleSink::new(article_tx);
        for scraper in all_scrapers(&sink, &self.config.scrapy.ua) {
            info!(scraper = scraper.name(), "Startup scrapy");
            let start = Instant::now();
            if let Err(e) = scraper.run().await {
                error!(scraper = scraper.name(), error = %e, "Scrape task failed");
                return Err(e);
            }
            info!(scraper = scraper.name(), elapsed = ?start.elapsed(), "Finished scrapy");
        }
        drop(sink);

        // Drain: closing the intake closes the batcher, closing the batcher
        // closes the queue; the queue waits out its counters.
        intake.await.context("Intake worker panicked")?;
        let queue = batcher.await.context("Translation worker panicked")?;
        queue.close_and_wait().await;

        // Publish: every backend switches, the read service hears about it
        // through the notification channel, then old snapshots are swept.
        service.set_version(version).await;
        self.notifier.notify(version).await;
        if let Err(e) = service.sweep().await {
            error!(error = %e, "Retention sweep failed");
        }

        info!(version, "Scrape task finished");
        Ok(())
    }
}

/// Fill missing cover images, then pass articles on to translation.
async fn intake_worker(
    mut rx: mpsc::Receiver<Article>,
    tx: mpsc::Sender<Article>,
    searcher: Arc<ImageSearcher>,
) {
    while let Some(mut article) = rx.recv().await {
        if article.image.is_empty() {
            if let Some(url) = searcher.search(&article.title).await {
                article.image = url;
            }
        }
        if tx.send(article).await.is_err() {
            error!("Translation worker is gone, dropping article");
        }
    }
}

/// Single batching worker: pop up to `batch` articles at a time, translate
/// the titles in one request, dedup, hand off to the save queue. Exits when
/// the upstream is closed and the buffer is empty.
async fn translate_worker(
    mut rx: mpsc::Receiver<Article>,
    translator: Arc<Translator>,
    dedup: Arc<TitleDedup>,
    queue: SaveQueue,
    batch: usize,
) -> SaveQueue {
    let mut buf: Vec<Article> = Vec::with_capacity(batch.max(1));

    loop {
        buf.clear();
        let received = rx.recv_many(&mut buf, batch.max(1)).await;
        if received == 0 {
            break;
        }

        let pending: Vec<usize> = buf
            .iter()
            .enumerate()
            .filter(|(_, article)| needs_translation(article))
            .map(|(i, _)| i)
            .collect();
        let titles: Vec<String> = pending.iter().map(|&i| buf[i].title.clone()).collect();

        let translations = translator.translate_batch(&titles).await;
        for (&i, translated) in pending.iter().zip(translations) {
            if let Some(translated) = translated {
                apply_translation(&mut buf[i], translated);
            }
        }

        for article in buf.drain(..) {
            if !dedup.admit(&article) {
                continue;
            }
            queue.submit(article).await;
        }
    }

    queue
}
