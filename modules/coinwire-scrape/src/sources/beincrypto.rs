//! BeInCrypto — browser mode; homepage rails resolve through detail pages.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::{dates, ArticleSink, Scraper};
use crate::browser::BrowserFetcher;

const NAME: &str = "beincrypto";
const DOMAIN: &str = "https://www.beincrypto.com";

pub struct BeInCrypto {
    sink: ArticleSink,
    ua: String,
}

impl BeInCrypto {
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
            fetcher.on_html("article div[data-el='main-content']", move |el| {
                let mut article = Article::new(NAME, Category::Latest);
                article.title = el.child_text("header h1");
                article.image = el.child_attr("div.featured-images figure img.bic-featured", "src");
                article.author = el.child_text("div[data-el='bic-author-meta'] a span");
                article.summary = el.child_text("ul.in-brief-block li:nth-of-type(1)");
                article.pub_date = dates::rfc3339(&el.child_attr("time", "datetime"));
                article.link = link.clone();
                *found.lock().unwrap() = Some(article);
            });
        }
        fetcher.start().await;

        let article = found.lock().unwrap().take();
        article
    }

    async fn category_list(&self, path: &str, category: Category) -> Vec<Article> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let url = format!("{DOMAIN}{path}");
        let mut fetcher = BrowserFetcher::new(&url).with_ua(&self.ua);
        {
            let collected = collected.clone();
            fetcher.on_html("main#bic-main-content > div:nth-of-type(3) > div", move |el| {
                let mut article = Article::new(NAME, category.clone());
                article.title = el.child_text("h5 a");
                article.link = el.abs_url(&el.child_attr("h5 a", "href"));
                article.pub_date = dates::rfc3339(&el.child_attr("time", "datetime"));

                // srcset carries "thumb 1x, full 2x"; take the full variant
                let srcset = el.child_attr("div[data-el='bic-c-card-image'] a img", "data-srcset");
                if let Some(entry) = srcset.split(',').nth(1) {
                    if let Some(src) = entry.trim().split(' ').next() {
                        article.image = src.to_string();
                    }
                }

                collected.lock().unwrap().push(article);
            });
        }
        fetcher.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        articles
    }

    async fn resolve_rail(&self, links: Vec<String>, category: Category) {
        for link in links {
            match self.details(&link).await {
                Some(mut article) => {
                    article.category = category.clone();
                    self.sink.send([article]).await;
                }
                None => warn!(url = %link, "BeInCrypto detail page yielded no article"),
            }
        }
    }
}

#[async_trait]
impl Scraper for BeInCrypto {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        self.sink
            .send(self.category_list("/news/", Category::Latest).await)
            .await;
        self.sink
            .send(self.category_list("/analysis/", Category::Analysis).await)
            .await;
        self.sink
            .send(self.category_list("/opinion/", Category::Opinions).await)
            .await;

        // homepage rails: hero + featured list + most-reads list
        let hero_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let featured_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let most_read_links: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let mut fetcher = BrowserFetcher::new(DOMAIN).with_ua(&self.ua);
        {
            let hero_links = hero_links.clone();
            fetcher.on_html(
                "main#bic-main-content section:nth-of-type(1) > div > div:nth-of-type(1)",
                move |el| {
                    let link = el.child_attr("figure a", "href");
                    if !link.is_empty() {
                        hero_links.lock().unwrap().push(el.abs_url(&link));
                    }
                },
            );
        }
        {
            let featured_links = featured_links.clone();
            fetcher.on_html(
                "main#bic-main-content section:nth-of-type(1) > div > div:nth-of-type(2) ul li",
                move |el| {
                    let link = el.child_attr("a", "href");
                    if !link.is_empty() {
                        featured_links.lock().unwrap().push(el.abs_url(&link));
                    }
                },
            );
        }
        {
            let most_read_links = most_read_links.clone();
            fetcher.on_html(
                "main#bic-main-content section:nth-of-type(1) > div > div:nth-of-type(3) ul li",
                move |el| {
                    let link = el.child_attr("a", "href");
                    if !link.is_empty() {
                        most_read_links.lock().unwrap().push(el.abs_url(&link));
                    }
                },
            );
        }
        fetcher.start().await;

        let hero = std::mem::take(&mut *hero_links.lock().unwrap());
        let featured = std::mem::take(&mut *featured_links.lock().unwrap());
        let most_reads = std::mem::take(&mut *most_read_links.lock().unwrap());

        self.resolve_rail(hero, Category::Featured).await;
        self.resolve_rail(featured, Category::Featured).await;
        self.resolve_rail(most_reads, Category::MostReads).await;

        Ok(())
    }
}
