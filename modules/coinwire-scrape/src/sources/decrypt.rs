//! Decrypt — Next.js data endpoints discovered through the page build id.
//! Also the only source with per-coin feeds (`decrypt_coin`).

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::{dates, ArticleSink, Scraper};
use crate::fetcher::Fetcher;

const NAME: &str = "decrypt";
const COIN_NAME: &str = "decrypt_coin";
const DOMAIN: &str = "https://decrypt.co";
const MAX_COINS: usize = 30;

pub struct Decrypt {
    sink: ArticleSink,
}

impl Decrypt {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }

    /// The build id is embedded in the manifest script URL on any page.
    async fn build_id(&self) -> Option<String> {
        let found: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let mut fetcher = Fetcher::new(DOMAIN);
        {
            let found = found.clone();
            fetcher.on_html("head script[src$='_buildManifest.js']", move |el| {
                let src = el.attr("src");
                if let Some(id) = src.split('/').nth(3) {
                    *found.lock().unwrap() = Some(id.to_string());
                }
            });
        }
        fetcher.start().await;

        let id = found.lock().unwrap().clone();
        id
    }

    async fn fetch_news(&self, fetcher: &Fetcher, url: &str, category: Category) {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        let mut page = fetcher.clone_for(url);
        {
            let collected = collected.clone();
            page.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected decrypt response");
                    return;
                }
                collected
                    .lock()
                    .unwrap()
                    .extend(parse_news(&r.body, NAME, category.clone()));
            });
        }
        page.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        self.sink.send(articles).await;
    }

    async fn fetch_coins(&self, fetcher: &Fetcher, build_id: &str) {
        let slugs: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let url = format!("{DOMAIN}/_next/data/{build_id}/en-US/degen-alley.json");
        let mut listing = fetcher.clone_for(&url);
        {
            let slugs = slugs.clone();
            listing.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected decrypt response");
                    return;
                }
                *slugs.lock().unwrap() = parse_coin_slugs(&r.body, MAX_COINS);
            });
        }
        listing.start().await;

        let slugs = std::mem::take(&mut *slugs.lock().unwrap());
        info!(count = slugs.len(), "Decrypt coin feeds to visit");

        for slug in slugs {
            let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));
            let url = format!("{DOMAIN}/_next/data/{build_id}/en-US/price/{slug}.json");
            let mut feed = fetcher.clone_for(&url);
            {
                let collected = collected.clone();
                let category = Category::Coin(slug.clone());
                feed.on_response(move |r| {
                    if !r.ok() {
                        error!(status = r.status, "Unexpected decrypt response");
                        return;
                    }
                    collected
                        .lock()
                        .unwrap()
                        .extend(parse_news(&r.body, COIN_NAME, category.clone()));
                });
            }
            feed.start().await;

            let articles = std::mem::take(&mut *collected.lock().unwrap());
            self.sink.send(articles).await;
        }
    }
}

#[async_trait]
impl Scraper for Decrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let Some(build_id) = self.build_id().await else {
            warn!("Decrypt build id not found, skipping source");
            return Ok(());
        };
        info!(build_id = %build_id, "Decrypt build id");

        let fetcher = Fetcher::new(DOMAIN);

        // per-coin feeds
        self.fetch_coins(&fetcher, &build_id).await;

        // latest
        let url =
            format!("{DOMAIN}/_next/data/{build_id}/en-US/news.json?parent_term_slug=news");
        self.fetch_news(&fetcher, &url, Category::Latest).await;

        // featured
        let url = format!(
            "{DOMAIN}/_next/data/{build_id}/en-US/news/editors-picks.json?parent_term_slug=news&term_slug=editors-picks"
        );
        self.fetch_news(&fetcher, &url, Category::Featured).await;

        // opinions
        let url = format!(
            "{DOMAIN}/_next/data/{build_id}/en-US/news/opinion.json?parent_term_slug=news&term_slug=opinion"
        );
        self.fetch_news(&fetcher, &url, Category::Opinions).await;

        Ok(())
    }
}

/// Walk the dehydrated react-query state for the first query carrying
/// `NewsArticleEntity` pages and return its article array.
fn news_entities(root: &Value) -> Option<&Vec<Value>> {
    for query in root["pageProps"]["dehydratedState"]["queries"]
        .as_array()
        .into_iter()
        .flatten()
    {
        let Some(data) = query["state"]["data"]["pages"][0]["articles"]["data"].as_array() else {
            continue;
        };
        let is_news = data
            .iter()
            .any(|item| item["__typename"].as_str() == Some("NewsArticleEntity"));
        if is_news {
            return query["state"]["data"]["pages"][0]["articles"]["data"].as_array();
        }
    }
    None
}

fn parse_news(body: &[u8], from: &str, category: Category) -> Vec<Article> {
    let Ok(root) = serde_json::from_slice::<Value>(body) else {
        return Vec::new();
    };

    let mut articles = Vec::new();
    for item in news_entities(&root).into_iter().flatten() {
        let mut article = Article::new(from, category.clone());
        article.title = item["title"].as_str().unwrap_or_default().to_string();
        article.summary = item["blurb"].as_str().unwrap_or_default().to_string();
        article.image = item["featuredImage"]["src"].as_str().unwrap_or_default().to_string();
        article.author = item["authors"]["data"][0]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let path = item["meta"]["hreflangs"][0]["path"].as_str().unwrap_or_default();
        if !path.is_empty() {
            article.link = format!("{DOMAIN}{path}");
        }
        article.pub_date =
            dates::naive("%Y-%m-%dT%H:%M:%S", item["publishedAt"].as_str().unwrap_or_default());
        articles.push(article);
    }

    articles
}

fn parse_coin_slugs(body: &[u8], limit: usize) -> Vec<String> {
    let Ok(root) = serde_json::from_slice::<Value>(body) else {
        return Vec::new();
    };

    root["pageProps"]["priceQuotes"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|quote| quote["slug"].as_str())
        .take(limit)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news_body() -> String {
        r#"{
            "pageProps": {
                "dehydratedState": {
                    "queries": [
                        {"state": {"data": {"pages": [{"other": true}]}}},
                        {"state": {"data": {"pages": [{
                            "articles": {"data": [
                                {
                                    "__typename": "NewsArticleEntity",
                                    "title": "DeFi protocol exploited",
                                    "blurb": "Another bridge hack",
                                    "publishedAt": "2026-07-31T08:15:00",
                                    "featuredImage": {"src": "https://img.decrypt.co/1.png"},
                                    "authors": {"data": [{"name": "Sam Reporter"}]},
                                    "meta": {"hreflangs": [{"path": "/news/defi-exploit"}]}
                                }
                            ]}
                        }]}}}
                    ]
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn dehydrated_state_walk_finds_news_entities() {
        let articles = parse_news(news_body().as_bytes(), NAME, Category::Latest);
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.title, "DeFi protocol exploited");
        assert_eq!(a.link, "https://decrypt.co/news/defi-exploit");
        assert_eq!(a.author, "Sam Reporter");
        assert!(a.pub_date.is_some());
    }

    #[test]
    fn coin_feed_articles_carry_slug_category() {
        let articles = parse_news(
            news_body().as_bytes(),
            COIN_NAME,
            Category::Coin("solana".into()),
        );
        assert_eq!(articles[0].from, "decrypt_coin");
        assert!(articles[0].is_coin());
        assert_eq!(articles[0].category.as_str(), "solana");
    }

    #[test]
    fn coin_slugs_respect_the_cap() {
        let body = r#"{
            "pageProps": {"priceQuotes": [
                {"slug": "bitcoin"}, {"slug": "ethereum"}, {"slug": "solana"}
            ]}
        }"#;
        let slugs = parse_coin_slugs(body.as_bytes(), 2);
        assert_eq!(slugs, vec!["bitcoin", "ethereum"]);
    }
}
