//! The enrichment pipeline: batched title translation, cover-image
//! discovery, title dedup, and the save-queue worker pool, orchestrated
//! into one scrape run per invocation.

pub mod dedup;
pub mod queue;
pub mod task;
pub mod translate;

pub use dedup::TitleDedup;
pub use queue::SaveQueue;
pub use task::ScrapeTask;
pub use translate::Translator;
