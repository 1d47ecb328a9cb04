//! Relational backend. Canonical article rows with upsert-by-title
//! semantics; listing and search are other backends' jobs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coinwire_common::config::MysqlConfig;
use coinwire_common::{Article, Category};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::strategy::Strategy;

pub struct MysqlStorage {
    pool: MySqlPool,
}

impl MysqlStorage {
    pub async fn connect(config: &MysqlConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(50)
            .min_connections(2)
            .max_lifetime(Duration::from_secs(3600))
            .connect(&config.url())
            .await?;

        info!(host = %config.host, database = %config.database, "Connected to MySQL");
        Ok(Self { pool })
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.into()))?;
        Ok(())
    }

    /// Upsert keyed by title: an existing row keeps its id and create_time,
    /// every other field is overwritten and update_time advances.
    async fn upsert(&self, article: &Article) -> Result<()> {
        let token = article.gen_token();
        let now = Utc::now();

        let existing = sqlx::query("SELECT id, create_time FROM articles WHERE title = ? LIMIT 1")
            .bind(&article.title)
            .fetch_optional(&self.pool)
            .await?;

        match existing {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                let create_time: Option<DateTime<Utc>> = row.try_get("create_time")?;
                sqlx::query(
                    r#"
                    UPDATE articles SET
                        token = ?, `from` = ?, title_cn = ?, abstract = ?, abstract_cn = ?,
                        image = ?, link = ?, pub_date = ?, author = ?, category = ?,
                        reads = ?, interactions = ?, comments = ?, notes = ?,
                        create_time = ?, update_time = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&token)
                .bind(&article.from)
                .bind(&article.title_cn)
                .bind(&article.summary)
                .bind(&article.summary_cn)
                .bind(&article.image)
                .bind(&article.link)
                .bind(article.pub_date)
                .bind(&article.author)
                .bind(article.category.as_str())
                .bind(article.reads)
                .bind(article.interactions)
                .bind(article.comments)
                .bind(&article.notes)
                .bind(create_time)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO articles
                        (token, `from`, title, title_cn, abstract, abstract_cn,
                         image, link, pub_date, author, category,
                         reads, interactions, comments, notes, create_time, update_time)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&token)
                .bind(&article.from)
                .bind(&article.title)
                .bind(&article.title_cn)
                .bind(&article.summary)
                .bind(&article.summary_cn)
                .bind(&article.image)
                .bind(&article.link)
                .bind(article.pub_date)
                .bind(&article.author)
                .bind(article.category.as_str())
                .bind(article.reads)
                .bind(article.interactions)
                .bind(article.comments)
                .bind(&article.notes)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }
}

fn row_to_article(row: &MySqlRow) -> Result<Article> {
    let category: String = row.try_get("category")?;
    let mut article = Article::new("", Category::from(category));
    article.id = row.try_get("id")?;
    article.token = row.try_get("token")?;
    article.from = row.try_get("from")?;
    article.title = row.try_get("title")?;
    article.title_cn = row.try_get("title_cn")?;
    article.summary = row.try_get::<Option<String>, _>("abstract")?.unwrap_or_default();
    article.summary_cn = row
        .try_get::<Option<String>, _>("abstract_cn")?
        .unwrap_or_default();
    article.image = row.try_get("image")?;
    article.link = row.try_get("link")?;
    article.pub_date = row.try_get("pub_date")?;
    article.author = row.try_get("author")?;
    article.reads = row.try_get("reads")?;
    article.interactions = row.try_get("interactions")?;
    article.comments = row.try_get("comments")?;
    article.notes = row.try_get("notes")?;
    article.create_time = row.try_get("create_time")?;
    article.update_time = row.try_get("update_time")?;
    Ok(article)
}

#[async_trait]
impl Strategy for MysqlStorage {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn get(&self, token: &str) -> Result<Article> {
        let row = sqlx::query("SELECT * FROM articles WHERE token = ? LIMIT 1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_article(&row),
            None => Err(StorageError::NotFound(token.to_string())),
        }
    }

    async fn save(&self, article: &Article) -> Result<()> {
        self.upsert(article).await
    }

    async fn save_coin(&self, article: &Article) -> Result<()> {
        self.upsert(article).await
    }
}
