use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Article category. The five fixed buckets cover the regular news feeds;
/// per-coin feeds carry an arbitrary coin slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Featured,
    Latest,
    MostReads,
    Opinions,
    Analysis,
    Coin(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Featured => "featured",
            Category::Latest => "latest",
            Category::MostReads => "most-reads",
            Category::Opinions => "opinions",
            Category::Analysis => "analysis",
            Category::Coin(slug) => slug,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s {
            "featured" => Category::Featured,
            "latest" => Category::Latest,
            "most-reads" => Category::MostReads,
            "opinions" => Category::Opinions,
            "analysis" => Category::Analysis,
            other => Category::Coin(other.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from(s.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Category::from(s))
    }
}

/// The one domain entity. Produced by a source adapter, mutated only by the
/// enrichment pipeline, frozen on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Row id assigned by the relational backend; 0 until saved there.
    #[serde(default)]
    pub id: i64,
    /// sha256(title) lower-hex. Stable identity across runs.
    #[serde(default)]
    pub token: String,
    /// Source short identifier. A `_coin` suffix marks a per-coin feed.
    pub from: String,
    pub title: String,
    #[serde(rename = "title_cn", default)]
    pub title_cn: String,
    #[serde(rename = "abstract", default)]
    pub summary: String,
    #[serde(rename = "abstract_cn", default)]
    pub summary_cn: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: String,
    pub category: Category,
    #[serde(default)]
    pub reads: i32,
    #[serde(default)]
    pub interactions: i32,
    #[serde(default)]
    pub comments: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(from: &str, category: Category) -> Self {
        Self {
            id: 0,
            token: String::new(),
            from: from.to_string(),
            title: String::new(),
            title_cn: String::new(),
            summary: String::new(),
            summary_cn: String::new(),
            image: String::new(),
            link: String::new(),
            pub_date: None,
            author: String::new(),
            category,
            reads: 0,
            interactions: 0,
            comments: 0,
            notes: String::new(),
            create_time: None,
            update_time: None,
        }
    }

    /// Content token: sha256 of the title, lower-hex. Idempotent — an
    /// already-assigned token is returned as-is.
    pub fn gen_token(&self) -> String {
        if !self.token.is_empty() {
            return self.token.clone();
        }
        hex::encode(Sha256::digest(self.title.as_bytes()))
    }

    /// Sorted-set score: publication time as unix seconds, 0 when unknown.
    pub fn score(&self) -> f64 {
        self.pub_date.map(|d| d.timestamp() as f64).unwrap_or(0.0)
    }

    pub fn title_by_lang(&self, lang: &str) -> &str {
        if lang == "ch" {
            &self.title_cn
        } else {
            &self.title
        }
    }

    /// Coin-feed articles are routed through the coin save path.
    pub fn is_coin(&self) -> bool {
        self.from.ends_with("_coin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_sha256_hex_of_title() {
        let mut article = Article::new("coindesk", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();

        let token = article.gen_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        // Stable across runs and instances.
        let mut again = Article::new("jinse", Category::Featured);
        again.title = "Bitcoin hits new high".to_string();
        assert_eq!(token, again.gen_token());
    }

    #[test]
    fn gen_token_keeps_assigned_token() {
        let mut article = Article::new("binance", Category::Latest);
        article.title = "Some title".to_string();
        article.token = "abc123".to_string();
        assert_eq!(article.gen_token(), "abc123");
    }

    #[test]
    fn category_round_trips_through_serde() {
        for name in ["featured", "latest", "most-reads", "opinions", "analysis"] {
            let cat = Category::from(name);
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{name}\""));
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cat);
        }

        let coin: Category = serde_json::from_str("\"dogecoin\"").unwrap();
        assert_eq!(coin, Category::Coin("dogecoin".to_string()));
        assert_eq!(coin.as_str(), "dogecoin");
    }

    #[test]
    fn title_by_lang_picks_translation() {
        let mut article = Article::new("jinse", Category::Latest);
        article.title = "Bitcoin hits new high".to_string();
        article.title_cn = "比特币创新高".to_string();
        assert_eq!(article.title_by_lang("en"), "Bitcoin hits new high");
        assert_eq!(article.title_by_lang("ch"), "比特币创新高");
    }

    #[test]
    fn coin_suffix_routes_to_coin_path() {
        let article = Article::new("decrypt_coin", Category::Coin("solana".into()));
        assert!(article.is_coin());
        let regular = Article::new("decrypt", Category::Latest);
        assert!(!regular.is_coin());
    }

    #[test]
    fn summary_serializes_under_abstract() {
        let mut article = Article::new("coindesk", Category::Latest);
        article.title = "t".to_string();
        article.summary = "short take".to_string();
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["abstract"], "short take");
        assert!(value.get("summary").is_none());
    }
}
