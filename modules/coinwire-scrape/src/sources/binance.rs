//! Binance news feeds — JSON APIs that expect exchange-style headers.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use super::{dates, ArticleSink, Scraper};
use crate::fetcher::Fetcher;

const NAME: &str = "binance";
const DOMAIN: &str = "https://www.binance.com";

pub struct Binance {
    sink: ArticleSink,
}

impl Binance {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Scraper for Binance {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        // most reads
        let url = format!(
            "{DOMAIN}/bapi/composite/v3/friendly/pgc/content/article/list?pageIndex=1&pageSize=30&type=1"
        );
        let mut fetcher = Fetcher::new(&url)
            .with_header("content-type", "application/json")
            .with_header("clienttype", "web")
            .with_header("lang", "en-US");
        {
            let collected = collected.clone();
            fetcher.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected binance response");
                    return;
                }
                collected
                    .lock()
                    .unwrap()
                    .extend(parse_list(&r.body, Category::MostReads));
                info!("Binance most reads news scraped");
            });
        }
        fetcher.start().await;

        // latest
        let url = format!(
            "{DOMAIN}/bapi/composite/v4/friendly/pgc/feed/news/list?pageIndex=1&pageSize=30&strategy=6&tagId=0&featured=false"
        );
        let mut latest = fetcher.clone_for(&url);
        {
            let collected = collected.clone();
            latest.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected binance response");
                    return;
                }
                collected
                    .lock()
                    .unwrap()
                    .extend(parse_list(&r.body, Category::Latest));
                info!("Binance latest news scraped");
            });
        }
        latest.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        self.sink.send(articles).await;
        Ok(())
    }
}

fn parse_list(body: &[u8], category: Category) -> Vec<Article> {
    let Ok(root) = serde_json::from_slice::<Value>(body) else {
        return Vec::new();
    };

    let mut articles = Vec::new();
    for item in root["data"]["vos"].as_array().into_iter().flatten() {
        let mut article = Article::new(NAME, category.clone());
        article.title = item["title"].as_str().unwrap_or_default().to_string();
        article.author = item["authorName"].as_str().unwrap_or_default().to_string();
        article.summary = item["subTitle"].as_str().unwrap_or_default().to_string();
        article.link = item["webLink"].as_str().unwrap_or_default().to_string();
        article.image = item["coverMeta"]["url"].as_str().unwrap_or_default().to_string();
        article.pub_date = dates::from_unix(item["date"].as_i64().unwrap_or(0));
        article.reads = item["viewCount"].as_i64().unwrap_or(0) as i32;
        article.interactions = item["likeCount"].as_i64().unwrap_or(0) as i32;
        article.comments = item["commentCount"].as_i64().unwrap_or(0) as i32;
        articles.push(article);
    }

    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_feed_maps_engagement_metrics() {
        let body = r#"{
            "data": {
                "vos": [
                    {
                        "title": "BNB quarterly burn completed",
                        "authorName": "Binance Team",
                        "subTitle": "Another burn",
                        "webLink": "https://www.binance.com/en/news/1",
                        "coverMeta": {"url": "https://img.binance.com/1.png"},
                        "date": 1722470400,
                        "viewCount": 4321,
                        "likeCount": 87,
                        "commentCount": 12
                    }
                ]
            }
        }"#;

        let articles = parse_list(body.as_bytes(), Category::MostReads);
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.reads, 4321);
        assert_eq!(a.interactions, 87);
        assert_eq!(a.comments, 12);
        assert_eq!(a.category, Category::MostReads);
        assert_eq!(a.image, "https://img.binance.com/1.png");
    }

    #[test]
    fn missing_vos_yields_nothing() {
        assert!(parse_list(br#"{"data": {}}"#, Category::Latest).is_empty());
    }
}
