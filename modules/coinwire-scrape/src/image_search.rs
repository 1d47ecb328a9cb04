//! Cover-image discovery for articles whose source provided none.
//!
//! Drives the headless browser against Bing Images with the article title
//! as the query and takes the first result's full-size URL. The browser
//! context is not re-entrant, so searches serialize through a mutex.

use std::time::Duration;

use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::browser;

const SEARCH_URL: &str = "https://www.bing.com/images/search";
const ATTEMPTS: u32 = 5;
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);
const ATTEMPT_SLEEP: Duration = Duration::from_secs(3);

pub struct ImageSearcher {
    ua: Option<String>,
    lock: Mutex<()>,
}

impl ImageSearcher {
    pub fn new(ua: &str) -> Self {
        Self {
            ua: if ua.is_empty() {
                None
            } else {
                Some(ua.to_string())
            },
            lock: Mutex::new(()),
        }
    }

    /// Best-effort search. Returns `None` after five failed attempts; the
    /// article then ships without a cover image.
    pub async fn search(&self, query: &str) -> Option<String> {
        let _guard = self.lock.lock().await;

        let url = match Url::parse_with_params(SEARCH_URL, &[("q", query)]) {
            Ok(url) => url,
            Err(e) => {
                warn!(query, error = %e, "Failed to build image search URL");
                return None;
            }
        };

        for attempt in 1..=ATTEMPTS {
            match tokio::time::timeout(ATTEMPT_TIMEOUT, self.attempt(url.as_str())).await {
                Ok(Some(found)) => {
                    info!(query, url = %found, attempt, "Found cover image");
                    return Some(found);
                }
                Ok(None) => {
                    warn!(query, attempt, "No image result");
                }
                Err(_) => {
                    warn!(query, attempt, "Image search timed out");
                }
            }
            if attempt < ATTEMPTS {
                tokio::time::sleep(ATTEMPT_SLEEP).await;
            }
        }

        None
    }

    async fn attempt(&self, url: &str) -> Option<String> {
        let html = browser::render(url, self.ua.as_deref()).await.ok()?;
        first_image_url(&html)
    }
}

/// First full-size image URL on a Bing Images result page. Result tiles
/// carry a `m` attribute holding JSON with the original image under `murl`.
fn first_image_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let tile = Selector::parse("a.iusc").ok()?;

    for node in document.select(&tile) {
        let Some(meta) = node.value().attr("m") else {
            continue;
        };
        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(meta) else {
            continue;
        };
        if let Some(murl) = parsed.get("murl").and_then(|v| v.as_str()) {
            if !murl.is_empty() {
                return Some(murl.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tile_murl_wins() {
        let html = r#"
            <html><body>
                <a class="iusc" m='{"murl":"https://img.example/full-1.jpg","turl":"https://img.example/thumb-1.jpg"}'></a>
                <a class="iusc" m='{"murl":"https://img.example/full-2.jpg"}'></a>
            </body></html>
        "#;
        assert_eq!(
            first_image_url(html).as_deref(),
            Some("https://img.example/full-1.jpg")
        );
    }

    #[test]
    fn malformed_tiles_are_skipped() {
        let html = r#"
            <html><body>
                <a class="iusc" m="not json"></a>
                <a class="iusc" m='{"murl":"https://img.example/ok.jpg"}'></a>
            </body></html>
        "#;
        assert_eq!(
            first_image_url(html).as_deref(),
            Some("https://img.example/ok.jpg")
        );
    }

    #[test]
    fn no_tiles_means_no_image() {
        assert!(first_image_url("<html><body></body></html>").is_none());
    }
}
