//! Key/value backend — the primary source for listing reads.
//!
//! Layout, all keys prefixed `{version}:` when a version is active:
//!   news:tokens:{token}             article body, JSON
//!   news:category:{category}        zset of tokens, score = pub_date unix
//!   news:origin:{from}              zset of tokens per origin
//!   news:origins:category:{cat}     set of origins seen in a category
//!   news:all:tokens                 zset of every token
//!   coin:slugs:{slug}               list of coin-feed tokens
//!   coin:news:token:{token}         coin article body, JSON
//! The version registry `data:versions` is global and unprefixed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use coinwire_common::config::RedisConfig;
use coinwire_common::Article;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info};

use crate::error::{Result, StorageError};
use crate::strategy::Strategy;

const VERSIONS_KEY: &str = "data:versions";

pub struct RedisStorage {
    conn: ConnectionManager,
    version: AtomicI64,
    retention: usize,
}

fn token_key(token: &str) -> String {
    format!("news:tokens:{token}")
}

fn category_key(category: &str) -> String {
    format!("news:category:{category}")
}

fn origin_key(origin: &str) -> String {
    format!("news:origin:{origin}")
}

fn origins_set_key(category: &str) -> String {
    format!("news:origins:category:{category}")
}

fn all_tokens_key() -> String {
    "news:all:tokens".to_string()
}

fn coin_list_key(slug: &str) -> String {
    format!("coin:slugs:{slug}")
}

fn coin_token_key(token: &str) -> String {
    format!("coin:news:token:{token}")
}

fn versioned_key(version: i64, suffix: String) -> String {
    if version > 0 {
        format!("{version}:{suffix}")
    } else {
        suffix
    }
}

impl RedisStorage {
    pub async fn connect(config: &RedisConfig, version: i64, retention: usize) -> Result<Self> {
        let client = redis::Client::open(config.url())?;
        let conn = ConnectionManager::new(client).await?;
        info!(addr = %config.addr, db = config.db, version, "Connected to Redis");

        Ok(Self {
            conn,
            version: AtomicI64::new(version),
            retention,
        })
    }

    /// Prefix a layout key with the active version.
    fn key(&self, suffix: String) -> String {
        versioned_key(self.version.load(Ordering::SeqCst), suffix)
    }

    async fn fetch(&self, token: &str) -> Result<Article> {
        let mut conn = self.conn.clone();
        let body: Option<String> = conn.get(self.key(token_key(token))).await?;
        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Err(StorageError::NotFound(token.to_string())),
        }
    }

    async fn fetch_many(&self, tokens: &[String]) -> Vec<Article> {
        let mut articles = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Ok(article) = self.fetch(token).await {
                articles.push(article);
            }
        }
        articles
    }
}

#[async_trait]
impl Strategy for RedisStorage {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get_version(&self) -> Result<i64> {
        let mut conn = self.conn.clone();
        let versions: Vec<String> = conn.zrevrange(VERSIONS_KEY, 0, 0).await?;
        if let Some(latest) = versions.first() {
            if let Ok(version) = latest.parse::<i64>() {
                self.version.store(version, Ordering::SeqCst);
            }
        }
        Ok(self.version.load(Ordering::SeqCst))
    }

    async fn set_version(&self, version: i64) {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn
            .zadd(VERSIONS_KEY, version.to_string(), version as f64)
            .await;
        if let Err(e) = result {
            error!(version, error = %e, "Failed to record data version");
        }
        self.version.store(version, Ordering::SeqCst);
    }

    async fn get(&self, token: &str) -> Result<Article> {
        self.fetch(token).await
    }

    async fn save(&self, article: &Article) -> Result<()> {
        let mut conn = self.conn.clone();

        let mut article = article.clone();
        article.token = article.gen_token();
        let score = article.score();
        let body = serde_json::to_string(&article)?;

        let _: () = conn.set(self.key(token_key(&article.token)), body).await?;
        let _: () = conn
            .zadd(
                self.key(category_key(article.category.as_str())),
                &article.token,
                score,
            )
            .await?;
        let _: () = conn
            .zadd(self.key(origin_key(&article.from)), &article.token, score)
            .await?;
        let _: () = conn
            .sadd(
                self.key(origins_set_key(article.category.as_str())),
                &article.from,
            )
            .await?;
        let _: () = conn
            .zadd(self.key(all_tokens_key()), &article.token, score)
            .await?;

        Ok(())
    }

    async fn save_coin(&self, article: &Article) -> Result<()> {
        let mut conn = self.conn.clone();

        let mut article = article.clone();
        article.token = article.gen_token();
        let body = serde_json::to_string(&article)?;

        let _: () = conn
            .lpush(
                self.key(coin_list_key(article.category.as_str())),
                &article.token,
            )
            .await?;
        let _: () = conn
            .set(self.key(coin_token_key(&article.token)), body)
            .await?;

        Ok(())
    }

    async fn home_list(
        &self,
        category: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let mut conn = self.conn.clone();

        let key = if category.is_empty() {
            self.key(all_tokens_key())
        } else {
            self.key(category_key(category))
        };

        let start = (page.saturating_sub(1) * size) as isize;
        let stop = (page * size) as isize - 1;
        let tokens: Vec<String> = conn.zrevrange(&key, start, stop).await?;
        let count: u64 = conn.zcard(&key).await?;

        Ok((self.fetch_many(&tokens).await, count))
    }

    async fn read_list(
        &self,
        origins: &[String],
        category: &str,
    ) -> Result<HashMap<String, Vec<Article>>> {
        let mut conn = self.conn.clone();

        let temp_union = format!("temp:news:origin:{}", origins.join("."));
        let temp_inter = format!("{temp_union}:inter");

        let mut keys: Vec<String> = Vec::new();
        if origins.len() == 1 {
            keys.push(self.key(origin_key(&origins[0])));
        } else if !origins.is_empty() {
            let union_keys: Vec<String> =
                origins.iter().map(|o| self.key(origin_key(o))).collect();
            let _: () = conn.zunionstore(&temp_union, &union_keys).await?;
            keys.push(temp_union.clone());
        }
        if !category.is_empty() {
            keys.push(self.key(category_key(category)));
        }
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let _: () = conn.zinterstore(&temp_inter, &keys).await?;
        let tokens: Vec<String> = conn.zrange(&temp_inter, 0, -1).await?;

        let mut grouped: HashMap<String, Vec<Article>> = HashMap::new();
        for article in self.fetch_many(&tokens).await {
            grouped.entry(article.from.clone()).or_default().push(article);
        }

        let _: () = conn.del(&[temp_union, temp_inter]).await?;

        Ok(grouped)
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>> {
        let mut conn = self.conn.clone();
        let tokens: Vec<String> = conn.zrange(self.key(category_key(category)), 0, -1).await?;
        Ok(self.fetch_many(&tokens).await)
    }

    async fn list_by_origin(
        &self,
        origin: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        let mut conn = self.conn.clone();

        let key = self.key(origin_key(origin));
        let start = (page.saturating_sub(1) * size) as isize;
        let stop = (page * size) as isize - 1;
        let tokens: Vec<String> = conn.zrevrange(&key, start, stop).await?;
        let count: u64 = conn.zcard(&key).await?;

        Ok((self.fetch_many(&tokens).await, count))
    }

    async fn origins_by_category(&self, category: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let origins: Vec<String> = conn.smembers(self.key(origins_set_key(category))).await?;
        Ok(origins)
    }

    async fn sweep(&self) -> Result<()> {
        let mut conn = self.conn.clone();

        let expired: Vec<String> = conn
            .zrevrange(VERSIONS_KEY, self.retention as isize, -1)
            .await?;

        for version in expired {
            let keys: Vec<String> = conn.keys(format!("{version}:*")).await?;
            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    error!(version = %version, error = %e, "Failed to delete snapshot keys");
                    continue;
                }
            }
            let _: () = conn.zrem(VERSIONS_KEY, &version).await?;
            info!(version = %version, "Swept expired snapshot");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_keys_match_the_documented_scheme() {
        assert_eq!(token_key("abc"), "news:tokens:abc");
        assert_eq!(category_key("latest"), "news:category:latest");
        assert_eq!(origin_key("coindesk"), "news:origin:coindesk");
        assert_eq!(origins_set_key("latest"), "news:origins:category:latest");
        assert_eq!(all_tokens_key(), "news:all:tokens");
        assert_eq!(coin_list_key("solana"), "coin:slugs:solana");
        assert_eq!(coin_token_key("abc"), "coin:news:token:abc");
    }

    #[test]
    fn version_prefix_applies_only_when_active() {
        assert_eq!(
            versioned_key(1722470400, token_key("abc")),
            "1722470400:news:tokens:abc"
        );
        assert_eq!(versioned_key(0, token_key("abc")), "news:tokens:abc");
    }
}
