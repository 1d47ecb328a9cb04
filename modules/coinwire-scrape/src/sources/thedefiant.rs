//! The Defiant — browser mode, relative timestamps ("3 hours ago").

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::{dates, ArticleSink, Scraper};
use crate::browser::BrowserFetcher;

const NAME: &str = "thedefiant";
const DOMAIN: &str = "https://thedefiant.io";

pub struct TheDefiant {
    sink: ArticleSink,
    ua: String,
}

impl TheDefiant {
    pub fn new(sink: ArticleSink, ua: &str) -> Self {
        Self {
            sink,
            ua: ua.to_string(),
        }
    }

    async fn details(&self, url: &str) -> Option<Article> {
        let found: Arc<Mutex<Option<Article>>> = Arc::new(Mutex::new(None));

        let mut fetcher = BrowserFetcher::new(url).with_ua(&self.ua);
        {
            let found = found.clone();
            let link = url.to_string();
            fetcher.on_html("article", move |el| {
                let mut article = Article::new(NAME, Category::Latest);
                article.title = el.child_text("h1:first-of-type");
                article.summary = el.child_text("div:first-of-type");
                article.author = el.child_text("div:nth-of-type(2) a");
                article.image = el.abs_url(&el.child_attr("img.object-cover", "src"));
                article.link = link.clone();

                // byline reads "Author • 3 hours ago"
                let byline = el.child_text("div:nth-of-type(2)");
                if let Some((_, raw)) = byline.split_once('•') {
                    article.pub_date = dates::relative(raw.trim(), Utc::now());
                }

                *found.lock().unwrap() = Some(article);
            });
        }
        fetcher.start().await;

        let article = found.lock().unwrap().take();
        article
    }

    async fn news_list(&self, url: &str, category: Category) -> Vec<Article> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = BrowserFetcher::new(url).with_ua(&self.ua);
        {
            let collected = collected.clone();
            fetcher.on_html("main section.mt-4 > div:first-of-type > div", move |el| {
                let mut article = Article::new(NAME, category.clone());
                article.title = el.child_text("div:nth-of-type(2) a h3");
                article.link =
                    el.abs_url(&el.child_attr("div:nth-of-type(2) div a:last-of-type", "href"));
                article.summary = el.child_text("div:nth-of-type(2) div.text-base");
                article.image = el.abs_url(&el.child_attr("div:nth-of-type(2) img.object-cover", "src"));
                article.pub_date =
                    dates::relative(&el.child_text("span.text-xs"), Utc::now());
                collected.lock().unwrap().push(article);
            });
        }
        fetcher.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        articles
    }
}

#[async_trait]
impl Scraper for TheDefiant {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        // latest
        let latest = self.news_list(&format!("{DOMAIN}/latest"), Category::Latest).await;
        self.sink.send(latest).await;

        // analysis
        let analysis = self
            .news_list(&format!("{DOMAIN}/news/deep-newz"), Category::Analysis)
            .await;
        self.sink.send(analysis).await;

        // opinions
        let opinions = self
            .news_list(
                &format!("{DOMAIN}/news/research-and-opinion"),
                Category::Opinions,
            )
            .await;
        self.sink.send(opinions).await;

        // homepage: featured links resolved via detail pages, plus a
        // most-reads rail with inline records
        let featured_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let most_reads: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = BrowserFetcher::new(DOMAIN).with_ua(&self.ua);
        {
            let featured_links = featured_links.clone();
            fetcher.on_html("main div.grid > div.flex > div.grid h3 a", move |el| {
                let link = el.attr("href");
                if !link.is_empty() {
                    featured_links.lock().unwrap().push(el.abs_url(&link));
                }
            });
        }
        {
            let most_reads = most_reads.clone();
            fetcher.on_html(
                "main div.grid div.flex div.grid:last-of-type div.flex-row",
                move |el| {
                    let mut article = Article::new(NAME, Category::MostReads);
                    article.title = el.child_text("h3 a");
                    article.link = el.abs_url(&el.child_attr("h3 a", "href"));
                    article.image = el.abs_url(&el.child_attr("a img", "src"));
                    article.pub_date =
                        dates::relative(&el.child_text("span.text-xs"), Utc::now());
                    most_reads.lock().unwrap().push(article);
                },
            );
        }
        fetcher.start().await;

        let featured_links_taken = std::mem::take(&mut *featured_links.lock().unwrap());
        for link in featured_links_taken {
            match self.details(&link).await {
                Some(mut article) => {
                    article.category = Category::Featured;
                    self.sink.send([article]).await;
                }
                None => warn!(url = %link, "The Defiant detail page yielded no article"),
            }
        }

        let most_reads_taken = std::mem::take(&mut *most_reads.lock().unwrap());
        self.sink.send(most_reads_taken).await;

        Ok(())
    }
}
