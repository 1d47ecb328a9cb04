//! Jinse (金色财经) — Chinese-language source, three JSON feeds.

use anyhow::Result;
use async_trait::async_trait;
use coinwire_common::{Article, Category};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::error;

use super::{dates, ArticleSink, Scraper};
use crate::fetcher::Fetcher;

const NAME: &str = "jinse";
const FEATURED_URL: &str = "https://api.jinse.cn/noah/v3/timelines?catelogue_key=www&limit=30";
const LATEST_URL: &str = "https://newapi.jinse.cn/noah/v1/breaking-news";
const MOST_READS_URL: &str = "https://newapi.jinse.cn/noah/v1/articles/hot?hour_diff=24";

pub struct JinSe {
    sink: ArticleSink,
}

impl JinSe {
    pub fn new(sink: ArticleSink) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Scraper for JinSe {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> Result<()> {
        let collected: Arc<Mutex<Vec<Article>>> = Arc::new(Mutex::new(Vec::new()));

        // featured
        let mut fetcher = Fetcher::new(FEATURED_URL);
        {
            let collected = collected.clone();
            fetcher.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected jinse response");
                    return;
                }
                collected.lock().unwrap().extend(parse_featured(&r.body));
            });
        }
        fetcher.start().await;

        // latest
        let mut latest = fetcher.clone_for(LATEST_URL);
        {
            let collected = collected.clone();
            latest.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected jinse response");
                    return;
                }
                collected
                    .lock()
                    .unwrap()
                    .extend(parse_news(&r.body, Category::Latest));
            });
        }
        latest.start().await;

        // most reads
        let mut hot = latest.clone_for(MOST_READS_URL);
        {
            let collected = collected.clone();
            hot.on_response(move |r| {
                if !r.ok() {
                    error!(status = r.status, "Unexpected jinse response");
                    return;
                }
                collected
                    .lock()
                    .unwrap()
                    .extend(parse_news(&r.body, Category::MostReads));
            });
        }
        hot.start().await;

        let articles = std::mem::take(&mut *collected.lock().unwrap());
        self.sink.send(articles).await;
        Ok(())
    }
}

fn parse_featured(body: &[u8]) -> Vec<Article> {
    let Ok(root) = serde_json::from_slice::<Value>(body) else {
        return Vec::new();
    };

    let mut articles = Vec::new();
    for entry in root["data"]["list"].as_array().into_iter().flatten() {
        let item = &entry["object_1"];
        if item.is_null() {
            continue;
        }

        let mut article = Article::new(NAME, Category::Featured);
        article.title = str_at(item, "title");
        article.summary = str_at(item, "summary");
        article.link = str_at(item, "jump_url");
        article.image = str_at(item, "cover");
        article.reads = item["show_read_number"].as_i64().unwrap_or(0) as i32;
        article.author = item["author"]["nickname"].as_str().unwrap_or_default().to_string();
        article.pub_date = dates::from_unix(item["published_at"].as_i64().unwrap_or(0));
        articles.push(article);
    }

    articles
}

fn parse_news(body: &[u8], category: Category) -> Vec<Article> {
    let Ok(root) = serde_json::from_slice::<Value>(body) else {
        return Vec::new();
    };

    let mut articles = Vec::new();
    for item in root["data"].as_array().into_iter().flatten() {
        let mut article = Article::new(NAME, category.clone());
        article.title = str_at(item, "title");
        article.link = str_at(item, "jump_url");
        article.pub_date = dates::from_unix(item["published_at"].as_i64().unwrap_or(0));

        if category == Category::MostReads {
            let covers = str_at(item, "covers");
            if !covers.is_empty() {
                article.image = format!("{covers}_small.png");
            }
            article.reads = item["read_number"].as_i64().unwrap_or(0) as i32;
            article.author = item["author"]["nickname"].as_str().unwrap_or_default().to_string();
        }

        articles.push(article);
    }

    articles
}

fn str_at(item: &Value, key: &str) -> String {
    item[key].as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featured_feed_parses_nested_objects() {
        let body = r#"{
            "data": {
                "list": [
                    {"object_1": {
                        "title": "比特币创新高",
                        "summary": "市场综述",
                        "jump_url": "https://www.jinse.cn/news/1.html",
                        "cover": "https://img.jinse.cn/1.png",
                        "show_read_number": 1200,
                        "published_at": 1722470400,
                        "author": {"nickname": "金色编辑"}
                    }},
                    {"no_object": true}
                ]
            }
        }"#;

        let articles = parse_featured(body.as_bytes());
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.from, "jinse");
        assert_eq!(a.category, Category::Featured);
        assert_eq!(a.title, "比特币创新高");
        assert_eq!(a.reads, 1200);
        assert_eq!(a.author, "金色编辑");
        assert!(a.pub_date.is_some());
    }

    #[test]
    fn most_reads_feed_gets_small_cover_variant() {
        let body = r#"{
            "data": [
                {
                    "title": "Hot piece",
                    "jump_url": "https://www.jinse.cn/news/2.html",
                    "published_at": 1722470400,
                    "covers": "https://img.jinse.cn/2",
                    "read_number": 999,
                    "author": {"nickname": "editor"}
                }
            ]
        }"#;

        let articles = parse_news(body.as_bytes(), Category::MostReads);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].image, "https://img.jinse.cn/2_small.png");
        assert_eq!(articles[0].reads, 999);
    }

    #[test]
    fn latest_feed_skips_engagement_fields() {
        let body = r#"{"data": [{"title": "t", "jump_url": "https://x", "published_at": 0}]}"#;
        let articles = parse_news(body.as_bytes(), Category::Latest);
        assert_eq!(articles[0].reads, 0);
        assert!(articles[0].image.is_empty());
        assert!(articles[0].pub_date.is_none());
    }

    #[test]
    fn malformed_body_yields_nothing() {
        assert!(parse_featured(b"not json").is_empty());
        assert!(parse_news(b"{}", Category::Latest).is_empty());
    }
}
