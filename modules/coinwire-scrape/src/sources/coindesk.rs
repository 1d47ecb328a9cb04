//! CoinDesk — static HTML; listing links resolved through detail pages.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::{dates, ArticleSink, Scraper};
use crate::fetcher::Fetcher;

const NAME: &str = "coindesk";
const DOMAIN: &str = "https://www.coindesk.com";

pub struct CoinDesk {
    sink: ArticleSink,
}

impl CoinDesk {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }

    /// Pull the full record off an article page.
    async fn details(&self, url: &str) -> Option<Article> {
        let found: Arc<Mutex<Option<Article>>> = Arc::new(Mutex::new(None));

        let mut fetcher = Fetcher::new(url);
        {
            let found = found.clone();
            let link = url.to_string();
            fetcher.on_html("header.at-news-header", move |el| {
                let mut article = Article::new(NAME, Category::Latest);
                article.title = el.child_text("div.at-headline h1");
                article.author = el.child_text("div.at-authors span a");
                article.summary = el.child_text("div.at-subheadline h2");
                article.image = el.child_attr("div.media > figure > picture > img", "src");
                article.link = link.clone();

                let raw = el
                    .child_text("div.at-created div span")
                    .replace("p.m.", "PM")
                    .replace("a.m.", "AM");
                article.pub_date =
                    dates::naive("%b %d, %Y at %H:%M %p", dates::strip_tz_suffix(&raw));

                *found.lock().unwrap() = Some(article);
            });
        }
        fetcher.start().await;

        let article = found.lock().unwrap().take();
        article
    }

    async fn listing(&self) -> Vec<(String, Category)> {
        let entries: Arc<Mutex<Vec<(String, Category)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = Fetcher::new(DOMAIN);

        // latest
        {
            let entries = entries.clone();
            fetcher.on_html("div.live-wire div[class^=live-wirestyles__Wrapper]", move |el| {
                let link = el.child_attr("div[class^=live-wirestyles__Title] a", "href");
                if !link.is_empty() {
                    entries
                        .lock()
                        .unwrap()
                        .push((el.abs_url(&link), Category::Latest));
                }
            });
        }

        // most reads
        {
            let entries = entries.clone();
            fetcher.on_html(
                "div.live-wire div[class^=most-read-articlestyles__Wrapper]",
                move |el| {
                    let link = el.child_attr("div[class^=most-read-articlestyles__Title] a", "href");
                    if !link.is_empty() {
                        entries
                            .lock()
                            .unwrap()
                            .push((el.abs_url(&link), Category::MostReads));
                    }
                },
            );
        }

        // opinions
        {
            let entries = entries.clone();
            fetcher.on_html(
                "div.opinion div[class^=opinionstyles__Wrapper] div[class^=opinionstyles__Wrapper]",
                move |el| {
                    let link = el.child_attr("div[class^=opinionstyles__Title] a", "href");
                    if !link.is_empty() {
                        entries
                            .lock()
                            .unwrap()
                            .push((el.abs_url(&link), Category::Opinions));
                    }
                },
            );
        }

        fetcher.start().await;

        let entries = std::mem::take(&mut *entries.lock().unwrap());
        entries
    }
}

#[async_trait]
impl Scraper for CoinDesk {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        for (url, category) in self.listing().await {
            // A failed detail page loses one entry, not the traversal.
            match self.details(&url).await {
                Some(mut article) => {
                    article.category = category;
                    self.sink.send([article]).await;
                }
                None => warn!(url = %url, "CoinDesk detail page yielded no article"),
            }
        }

        Ok(())
    }
}
