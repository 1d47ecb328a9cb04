pub mod article;
pub mod config;
pub mod similarity;
pub mod telemetry;

pub use article::{Article, Category};
pub use config::Config;
pub use similarity::{cosine_similarity, is_unique_title};
