//! Full-text search backend over the Elasticsearch HTTP API.
//!
//! The index is versioned as `<base>.<version>`; `title` gets an edge-ngram
//! autocomplete analyzer, everything else standard analysis. Only `search`
//! answers reads; the facade cascades past this backend for the rest.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use coinwire_common::config::ElasticConfig;
use coinwire_common::Article;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::{Result, StorageError};
use crate::strategy::Strategy;

const INDEX_MAPPING: &str = r#"
{
    "mappings": {
        "properties": {
            "id": {"type": "integer"},
            "token": {"type": "keyword"},
            "title": {
                "type": "text",
                "analyzer": "autocomplete",
                "search_analyzer": "standard"
            },
            "title_cn": {"type": "text"},
            "category": {"type": "keyword"},
            "from": {"type": "keyword"},
            "author": {"type": "keyword"},
            "abstract": {"type": "text"},
            "abstract_cn": {"type": "text"},
            "image": {"type": "text"},
            "link": {"type": "text"},
            "pub_date": {"type": "date"},
            "reads": {"type": "integer"},
            "interactions": {"type": "integer"},
            "comments": {"type": "integer"},
            "notes": {"type": "text"},
            "create_time": {"type": "date"},
            "update_time": {"type": "date"}
        }
    },
    "settings": {
        "analysis": {
            "filter": {
                "autocomplete_filter": {
                    "type": "edge_ngram",
                    "min_gram": 1,
                    "max_gram": 20
                }
            },
            "analyzer": {
                "autocomplete": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "autocomplete_filter"]
                }
            }
        }
    }
}
"#;

pub struct ElasticStorage {
    client: reqwest::Client,
    base_url: String,
    base_index: String,
    index: RwLock<String>,
    username: String,
    password: String,
    retention: usize,
}

fn index_name(base: &str, version: i64) -> String {
    if version > 0 {
        format!("{base}.{version}")
    } else {
        base.to_string()
    }
}

/// Which versioned indices fall outside the retention window. Names sort
/// lexicographically by version because versions are same-width unix
/// timestamps.
fn indices_to_drop(mut names: Vec<String>, keep: usize) -> Vec<String> {
    if names.len() <= keep {
        return Vec::new();
    }
    names.sort();
    names.truncate(names.len() - keep);
    names
}

impl ElasticStorage {
    pub async fn connect(config: &ElasticConfig, version: i64, retention: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        let storage = Self {
            client,
            base_url: config.addr.trim_end_matches('/').to_string(),
            base_index: config.index.clone(),
            index: RwLock::new(index_name(&config.index, version)),
            username: config.username.clone(),
            password: config.password.clone(),
            retention,
        };

        storage.ensure_index().await?;
        Ok(storage)
    }

    fn current_index(&self) -> String {
        self.index.read().expect("index lock poisoned").clone()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        if !self.username.is_empty() {
            builder = builder.basic_auth(&self.username, Some(&self.password));
        }
        builder
    }

    /// Create the versioned index if it does not exist yet.
    async fn ensure_index(&self) -> Result<()> {
        let index = self.current_index();

        let head = self
            .request(reqwest::Method::HEAD, &index)
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;
        if head.status() != reqwest::StatusCode::NOT_FOUND {
            info!(index = %index, "Search index already exists");
            return Ok(());
        }

        let resp = self
            .request(reqwest::Method::PUT, &index)
            .header("Content-Type", "application/json")
            .body(INDEX_MAPPING)
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(index = %index, body = %body, "Failed to create search index");
        } else {
            info!(index = %index, "Created search index");
        }

        Ok(())
    }
}

#[async_trait]
impl Strategy for ElasticStorage {
    fn name(&self) -> &'static str {
        "elastic"
    }

    async fn set_version(&self, version: i64) {
        if version > 0 {
            let mut index = self.index.write().expect("index lock poisoned");
            *index = index_name(&self.base_index, version);
        }
    }

    async fn save(&self, article: &Article) -> Result<()> {
        let mut article = article.clone();
        article.token = article.gen_token();
        let index = self.current_index();

        let resp = self
            .request(
                reqwest::Method::PUT,
                &format!("{index}/_create/{}", article.token),
            )
            .json(&article)
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            let resp = self
                .request(
                    reqwest::Method::POST,
                    &format!("{index}/_update/{}", article.token),
                )
                .json(&json!({ "doc": article }))
                .send()
                .await
                .map_err(|e| StorageError::Search(e.to_string()))?;
            if !resp.status().is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(StorageError::Search(format!(
                    "update failed for {}: {body}",
                    article.token
                )));
            }
            return Ok(());
        }

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Search(format!(
                "index failed for {}: {body}",
                article.token
            )));
        }

        Ok(())
    }

    /// Coin feeds are not searchable; nothing to index.
    async fn save_coin(&self, _article: &Article) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        keyword: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let index = self.current_index();
        let body = json!({
            "query": {
                "query_string": {"query": keyword, "default_field": "title"}
            },
            "from": page.saturating_sub(1) * size,
            "size": size,
            "sort": [
                {"pub_date": {"order": "desc", "unmapped_type": "date"}},
                {"reads": {"order": "desc"}}
            ],
            "track_total_hits": true
        });

        let resp = self
            .request(reqwest::Method::POST, &format!("{index}/_search"))
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Search(format!("search failed: {body}")));
        }

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;

        let mut articles = Vec::new();
        for hit in parsed["hits"]["hits"].as_array().into_iter().flatten() {
            match serde_json::from_value::<Article>(hit["_source"].clone()) {
                Ok(article) => articles.push(article),
                Err(e) => error!(error = %e, "Skipping unparseable search hit"),
            }
        }
        let total = parsed["hits"]["total"]["value"].as_u64().unwrap_or(0);

        Ok((articles, total))
    }

    async fn sweep(&self) -> Result<()> {
        let path = format!("_cat/indices/{}.*?format=json", self.base_index);
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;

        if !resp.status().is_success() {
            return Ok(());
        }

        let listing: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;
        let names: Vec<String> = listing
            .iter()
            .filter_map(|entry| entry["index"].as_str())
            .map(str::to_string)
            .collect();

        let expired = indices_to_drop(names, self.retention);
        if expired.is_empty() {
            return Ok(());
        }

        let resp = self
            .request(reqwest::Method::DELETE, &expired.join(","))
            .send()
            .await
            .map_err(|e| StorageError::Search(e.to_string()))?;
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(body = %body, "Failed to delete expired indices");
        } else {
            info!(count = expired.len(), "Swept expired search indices");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_is_versioned() {
        assert_eq!(index_name("news", 1722470400), "news.1722470400");
        assert_eq!(index_name("news", 0), "news");
    }

    #[test]
    fn retention_keeps_the_newest_indices() {
        let names = vec![
            "news.1000".to_string(),
            "news.3000".to_string(),
            "news.2000".to_string(),
            "news.5000".to_string(),
            "news.4000".to_string(),
        ];
        let dropped = indices_to_drop(names, 3);
        assert_eq!(dropped, vec!["news.1000", "news.2000"]);
    }

    #[test]
    fn retention_is_a_noop_under_the_window() {
        let names = vec!["news.1000".to_string(), "news.2000".to_string()];
        assert!(indices_to_drop(names, 3).is_empty());
    }

    #[test]
    fn index_mapping_is_valid_json_with_autocomplete() {
        let mapping: Value = serde_json::from_str(INDEX_MAPPING).unwrap();
        assert_eq!(
            mapping["mappings"]["properties"]["title"]["analyzer"],
            "autocomplete"
        );
        assert_eq!(
            mapping["settings"]["analysis"]["filter"]["autocomplete_filter"]["max_gram"],
            20
        );
    }
}
