//! Scraping layer: a uniform fetcher over static HTTP and headless-browser
//! navigation, plus one adapter per news source.

pub mod browser;
pub mod element;
pub mod error;
pub mod fetcher;
pub mod image_search;
pub mod sources;

pub use error::{Result, ScrapeError};
pub use fetcher::{Fetcher, Response};
pub use image_search::ImageSearcher;
pub use sources::{ArticleSink, Scraper};
