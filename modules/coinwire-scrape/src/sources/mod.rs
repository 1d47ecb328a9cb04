//! One adapter per news source.
//!
//! Adapters traverse hand-authored selector / JSON paths for their site,
//! normalize what they find into [`Article`] records and emit them through
//! an [`ArticleSink`]. They never touch storage.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::Article;
use tokio::sync::mpsc;
use tracing::{error, warn};

pub mod beincrypto;
pub mod binance;
pub mod bitpie;
pub mod blockworks;
pub mod coindesk;
pub mod decrypt;
pub mod jinse;
pub mod theblock;
pub mod thedefiant;

pub(crate) mod dates;

#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce this source's articles for one run.
    async fn run(&self) -> Result<()>;
}

/// Validating handle into the enrichment intake. Records without a title or
/// link never make it past here.
#[derive(Clone)]
pub struct ArticleSink {
    tx: mpsc::Sender<Article>,
}

impl ArticleSink {
    pub fn new(tx: mpsc::Sender<Article>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, articles: impl IntoIterator<Item = Article>) {
        for article in articles {
            if article.title.is_empty() || article.link.is_empty() {
                warn!(
                    from = %article.from,
                    category = %article.category,
                    link = %article.link,
                    "Dropping article with missing title or link"
                );
                continue;
            }
            if let Err(e) = self.tx.send(article).await {
                error!(error = %e, "Failed to queue article");
            }
        }
    }
}

/// Every adapter, in the order a scrape run visits them.
pub fn all_scrapers(sink: &ArticleSink, ua: &str) -> Vec<Box<dyn Scraper>> {
    vec![
        Box::new(jinse::JinSe::new(sink.clone())),
        Box::new(beincrypto::BeInCrypto::new(sink.clone(), ua)),
        Box::new(blockworks::BlockWorks::new(sink.clone())),
        Box::new(coindesk::CoinDesk::new(sink.clone())),
        Box::new(theblock::TheBlock::new(sink.clone(), ua)),
        Box::new(decrypt::Decrypt::new(sink.clone())),
        Box::new(thedefiant::TheDefiant::new(sink.clone(), ua)),
        Box::new(binance::Binance::new(sink.clone())),
        Box::new(bitpie::BitPie::new(sink.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwire_common::Category;

    #[tokio::test]
    async fn sink_drops_records_missing_required_fields() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ArticleSink::new(tx);

        let mut complete = Article::new("coindesk", Category::Latest);
        complete.title = "Bitcoin hits new high".to_string();
        complete.link = "https://www.coindesk.com/post".to_string();

        let mut untitled = Article::new("coindesk", Category::Latest);
        untitled.link = "https://www.coindesk.com/other".to_string();

        let mut linkless = Article::new("coindesk", Category::Latest);
        linkless.title = "No link".to_string();

        sink.send([complete, untitled, linkless]).await;
        drop(sink);

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.title, "Bitcoin hits new high");
        assert!(rx.recv().await.is_none());
    }
}
