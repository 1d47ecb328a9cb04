//! Category-scoped near-duplicate rejection.

use std::collections::HashMap;
use std::sync::Mutex;

use coinwire_common::{is_unique_title, Article};
use tracing::info;

/// Admitted-title sets per category, fresh for every scrape run. Decisions
/// are linearized behind the mutex so the same title arriving from two
/// sources cannot be admitted twice.
pub struct TitleDedup {
    threshold: f64,
    seen: Mutex<HashMap<String, Vec<String>>>,
}

impl TitleDedup {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Admit the article iff its title clears the similarity threshold
    /// against every previously admitted title in its category.
    pub fn admit(&self, article: &Article) -> bool {
        if article.title.is_empty() {
            return true;
        }

        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        let titles = seen.entry(article.category.as_str().to_string()).or_default();

        if is_unique_title(titles, &article.title, self.threshold) {
            titles.push(article.title.clone());
            true
        } else {
            info!(title = %article.title, link = %article.link, "Duplicate title");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwire_common::Category;

    fn article(from: &str, category: Category, title: &str) -> Article {
        let mut article = Article::new(from, category);
        article.title = title.to_string();
        article.link = format!("https://{from}.example/post");
        article
    }

    #[test]
    fn identical_title_from_second_source_is_rejected() {
        let dedup = TitleDedup::new(0.85);

        let first = article("jinse", Category::Latest, "Bitcoin hits new high");
        let second = article("bitpie", Category::Latest, "Bitcoin hits new high");

        assert!(dedup.admit(&first));
        assert!(!dedup.admit(&second));
    }

    #[test]
    fn same_title_in_another_category_is_admitted() {
        let dedup = TitleDedup::new(0.85);

        assert!(dedup.admit(&article("jinse", Category::Latest, "Bitcoin hits new high")));
        assert!(dedup.admit(&article("jinse", Category::Featured, "Bitcoin hits new high")));
    }

    #[test]
    fn dissimilar_titles_are_admitted() {
        let dedup = TitleDedup::new(0.85);

        assert!(dedup.admit(&article("coindesk", Category::Latest, "Bitcoin hits new high")));
        assert!(dedup.admit(&article("coindesk", Category::Latest, "SEC delays ETF decision")));
    }

    #[test]
    fn near_duplicate_above_threshold_is_rejected() {
        let dedup = TitleDedup::new(0.85);

        assert!(dedup.admit(&article(
            "coindesk",
            Category::Latest,
            "Bitcoin hits new all time high today"
        )));
        assert!(!dedup.admit(&article(
            "theblock",
            Category::Latest,
            "Bitcoin hits new all time high"
        )));
    }
}
