//! Batched title translation through the Kimi service.
//!
//! One request carries a whole batch of titles separated by blank lines;
//! the response is split back positionally. A count mismatch degrades to
//! one request per title so a drifting response can't mis-zip the batch.

use coinwire_common::Article;
use moonshot_client::MoonshotClient;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// Sources whose titles arrive in Chinese: the translation becomes the
/// English `title` and the original moves to `title_cn`.
pub fn is_chinese_source(from: &str) -> bool {
    matches!(from, "jinse" | "bitpie")
}

/// Whether enrichment owes this article a translation round-trip.
pub fn needs_translation(article: &Article) -> bool {
    is_chinese_source(&article.from)
        || (!article.title.is_empty() && article.title_cn.is_empty())
}

pub fn apply_translation(article: &mut Article, translated: String) {
    if is_chinese_source(&article.from) {
        article.title_cn = std::mem::replace(&mut article.title, translated);
    } else {
        article.title_cn = translated;
    }
}

/// Split a batch response on blank lines, falling back to single newlines.
pub fn split_batch_response(response: &str) -> Vec<String> {
    let delimiter = if response.contains("\n\n") { "\n\n" } else { "\n" };
    response
        .split(delimiter)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

pub struct Translator {
    client: MoonshotClient,
    prompt: String,
    /// The service is called single-flight: one outstanding request.
    lock: Mutex<()>,
}

impl Translator {
    pub fn new(api_key: &str, prompt: &str) -> Self {
        Self {
            client: MoonshotClient::new(api_key),
            prompt: prompt.to_string(),
            lock: Mutex::new(()),
        }
    }

    pub async fn translate(&self, content: &str) -> moonshot_client::Result<String> {
        let _guard = self.lock.lock().await;
        self.client.complete(&self.prompt, content).await
    }

    /// Translate a batch of titles, one slot per input. `None` marks a
    /// failed slot; the article proceeds untranslated.
    pub async fn translate_batch(&self, titles: &[String]) -> Vec<Option<String>> {
        if titles.is_empty() {
            return Vec::new();
        }

        let joined = titles.join("\n\n");
        match self.translate(&joined).await {
            Ok(response) => {
                let parts = split_batch_response(&response);
                if parts.len() == titles.len() {
                    return parts.into_iter().map(Some).collect();
                }
                warn!(
                    expected = titles.len(),
                    got = parts.len(),
                    "Batch translation misaligned, falling back to per-title requests"
                );
            }
            Err(e) => {
                error!(error = %e, "Batch translation failed");
                return vec![None; titles.len()];
            }
        }

        let mut out = Vec::with_capacity(titles.len());
        for title in titles {
            match self.translate(title).await {
                Ok(translated) => out.push(Some(translated)),
                Err(e) => {
                    error!(error = %e, title = %title, "Title translation failed");
                    out.push(None);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwire_common::Category;

    #[test]
    fn blank_line_split_is_preferred() {
        let parts = split_batch_response("First title\n\nSecond title\n\nThird title");
        assert_eq!(parts, vec!["First title", "Second title", "Third title"]);
    }

    #[test]
    fn single_newline_split_is_the_fallback() {
        let parts = split_batch_response("First title\nSecond title");
        assert_eq!(parts, vec!["First title", "Second title"]);
    }

    #[test]
    fn empty_segments_are_dropped() {
        let parts = split_batch_response("First\n\n\n\nSecond\n\n");
        assert_eq!(parts, vec!["First", "Second"]);
    }

    #[test]
    fn chinese_sources_swap_title_fields() {
        let mut article = Article::new("jinse", Category::Latest);
        article.title = "比特币创新高".to_string();

        apply_translation(&mut article, "Bitcoin hits new high".to_string());
        assert_eq!(article.title, "Bitcoin hits new high");
        assert_eq!(article.title_cn, "比特币创新高");
    }

    #[test]
    fn other_sources_fill_title_cn() {
        let mut article = Article::new("coindesk", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();

        apply_translation(&mut article, "比特币创新高".to_string());
        assert_eq!(article.title, "Bitcoin hits new high");
        assert_eq!(article.title_cn, "比特币创新高");
    }

    #[test]
    fn pre_translated_articles_are_skipped() {
        let mut article = Article::new("coindesk", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();
        article.title_cn = "比特币创新高".to_string();
        assert!(!needs_translation(&article));

        // Chinese sources always go through translation.
        let mut jinse = Article::new("jinse", Category::Latest);
        jinse.title = "比特币创新高".to_string();
        assert!(needs_translation(&jinse));
    }
}
