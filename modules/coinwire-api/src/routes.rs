//! Read-side HTTP API over the storage facade.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use coinwire_common::Article;
use coinwire_storage::Service;
use serde::{Deserialize, Serialize};

use crate::envelope::{error, ok, pager, ApiResponse};

pub struct AppState {
    pub service: Arc<Service>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/news/articles/token/:token", get(article_link))
        .route("/news/home", post(home))
        .route("/news/sitemap/:category/:lang", post(sitemap))
        .route("/news/origins", post(origins))
        .route("/news/reads", post(reads))
        .route("/news/search", post(search))
        .route("/news/:origin", post(by_origin))
        .with_state(state)
}

/// Public article shape: internal fields stripped, date formatted, title
/// chosen by language.
#[derive(Debug, Serialize)]
struct ArticleInfo {
    from: String,
    datetime: String,
    title: String,
    link: String,
    author: String,
    image: String,
    token: String,
    #[serde(rename = "abstract")]
    summary: String,
}

fn format_datetime(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn project(article: &Article, lang: &str) -> ArticleInfo {
    ArticleInfo {
        from: article.from.clone(),
        datetime: format_datetime(article.pub_date),
        title: article.title_by_lang(lang).to_string(),
        link: article.link.clone(),
        author: article.author.clone(),
        image: article.image.clone(),
        token: article.token.clone(),
        summary: article.summary.clone(),
    }
}

fn valid_lang(lang: &str) -> bool {
    matches!(lang, "en" | "ch")
}

fn default_page() -> usize {
    1
}

fn default_size() -> usize {
    15
}

fn default_lang() -> String {
    "en".to_string()
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

async fn article_link(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Json<ApiResponse> {
    match state.service.get(&token).await {
        Ok(article) => ok(serde_json::json!({ "link": article.link })),
        Err(_) => error(404, "resource not found"),
    }
}

#[derive(Debug, Deserialize)]
struct HomeRequest {
    #[serde(default)]
    category: String,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_size")]
    page_size: usize,
    #[serde(default = "default_lang")]
    lang: String,
}

async fn home(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HomeRequest>,
) -> Json<ApiResponse> {
    if req.page == 0 || req.page_size == 0 || !valid_lang(&req.lang) {
        return error(400, "invalid params");
    }

    match state
        .service
        .home_list(&req.category, req.page, req.page_size)
        .await
    {
        Ok((articles, total)) => {
            let list: Vec<ArticleInfo> = articles.iter().map(|a| project(a, &req.lang)).collect();
            pager(total, req.page, req.page_size, list)
        }
        Err(_) => error(500, "failed to list articles"),
    }
}

async fn sitemap(
    State(state): State<Arc<AppState>>,
    Path((category, lang)): Path<(String, String)>,
) -> Json<ApiResponse> {
    match state.service.list_by_category(&category).await {
        Ok(articles) => {
            let list: Vec<ArticleInfo> = articles.iter().map(|a| project(a, &lang)).collect();
            ok(list)
        }
        Err(_) => error(404, "resource not found"),
    }
}

#[derive(Debug, Deserialize)]
struct OriginsRequest {
    #[serde(default)]
    category: String,
}

async fn origins(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OriginsRequest>,
) -> Json<ApiResponse> {
    match state.service.origins_by_category(&req.category).await {
        Ok(origins) => ok(origins),
        Err(_) => error(500, "unknown category"),
    }
}

#[derive(Debug, Deserialize)]
struct ReadsRequest {
    #[serde(default)]
    origins: Vec<String>,
    #[serde(default)]
    category: String,
    #[serde(default = "default_lang")]
    lang: String,
}

async fn reads(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReadsRequest>,
) -> Json<ApiResponse> {
    if !valid_lang(&req.lang) {
        return error(400, "invalid params");
    }

    match state.service.read_list(&req.origins, &req.category).await {
        Ok(grouped) => {
            let projected: std::collections::HashMap<String, Vec<ArticleInfo>> = grouped
                .iter()
                .map(|(origin, articles)| {
                    (
                        origin.clone(),
                        articles.iter().map(|a| project(a, &req.lang)).collect(),
                    )
                })
                .collect();
            ok(projected)
        }
        Err(_) => error(500, "failed to list articles"),
    }
}

#[derive(Debug, Deserialize)]
struct PageRequest {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_size")]
    page_size: usize,
    #[serde(default = "default_lang")]
    lang: String,
}

async fn by_origin(
    State(state): State<Arc<AppState>>,
    Path(origin): Path<String>,
    Json(req): Json<PageRequest>,
) -> Json<ApiResponse> {
    if req.page == 0 || req.page_size == 0 || !valid_lang(&req.lang) {
        return error(400, "invalid params");
    }

    match state
        .service
        .list_by_origin(&origin, req.page, req.page_size)
        .await
    {
        Ok((articles, total)) => {
            let list: Vec<ArticleInfo> = articles.iter().map(|a| project(a, &req.lang)).collect();
            pager(total, req.page, req.page_size, list)
        }
        Err(_) => error(500, "failed to list articles"),
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    keyword: String,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_size")]
    page_size: usize,
    #[serde(default = "default_lang")]
    lang: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<ApiResponse> {
    if req.page == 0 || req.page_size == 0 || !valid_lang(&req.lang) {
        return error(400, "invalid params");
    }

    match state
        .service
        .search(&req.keyword, req.page, req.page_size)
        .await
    {
        Ok((articles, total)) => {
            let list: Vec<ArticleInfo> = articles.iter().map(|a| project(a, &req.lang)).collect();
            pager(total, req.page, req.page_size, list)
        }
        Err(_) => error(500, "search failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coinwire_common::Category;

    fn article() -> Article {
        let mut article = Article::new("jinse", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();
        article.title_cn = "比特币创新高".to_string();
        article.link = "https://www.jinse.cn/news/1.html".to_string();
        article.token = "abc123".to_string();
        article.summary = "short take".to_string();
        article.pub_date = Some(Utc.with_ymd_and_hms(2026, 8, 1, 9, 30, 0).unwrap());
        article.reads = 100;
        article
    }

    #[test]
    fn projection_formats_date_and_selects_language() {
        let projected = project(&article(), "ch");
        assert_eq!(projected.title, "比特币创新高");
        assert_eq!(projected.datetime, "2026-08-01 09:30:00");

        let projected = project(&article(), "en");
        assert_eq!(projected.title, "Bitcoin hits new high");
    }

    #[test]
    fn projection_strips_internal_fields() {
        let value = serde_json::to_value(project(&article(), "en")).unwrap();
        assert!(value.get("reads").is_none());
        assert!(value.get("category").is_none());
        assert_eq!(value["abstract"], "short take");
        assert_eq!(value["token"], "abc123");
    }

    #[test]
    fn missing_pub_date_renders_empty() {
        let mut article = article();
        article.pub_date = None;
        assert_eq!(project(&article, "en").datetime, "");
    }

    #[test]
    fn request_defaults_apply() {
        let req: HomeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 15);
        assert_eq!(req.lang, "en");
        assert_eq!(req.category, "");
    }

    #[test]
    fn lang_validation_is_closed() {
        assert!(valid_lang("en"));
        assert!(valid_lang("ch"));
        assert!(!valid_lang("fr"));
        assert!(!valid_lang(""));
    }
}
