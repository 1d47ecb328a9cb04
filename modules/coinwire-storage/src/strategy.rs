//! The storage contract every backend implements.

use std::collections::HashMap;

use async_trait::async_trait;
use coinwire_common::Article;

use crate::error::{Result, StorageError};

/// One storage backend. Each operation defaults to `NotImplemented` so a
/// backend only overrides the capabilities it actually has; the facade
/// treats `NotImplemented` as "try the next backend".
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Most recently published snapshot version, if this backend tracks it.
    async fn get_version(&self) -> Result<i64> {
        Err(StorageError::NotImplemented)
    }

    /// Switch this backend to a new active version. Infallible by contract;
    /// backends log internal failures.
    async fn set_version(&self, _version: i64) {}

    async fn get(&self, _token: &str) -> Result<Article> {
        Err(StorageError::NotImplemented)
    }

    async fn save(&self, _article: &Article) -> Result<()> {
        Err(StorageError::NotImplemented)
    }

    async fn save_coin(&self, _article: &Article) -> Result<()> {
        Err(StorageError::NotImplemented)
    }

    /// Paged home feed: all categories when `category` is empty.
    async fn home_list(
        &self,
        _category: &str,
        _page: usize,
        _size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        Err(StorageError::NotImplemented)
    }

    /// Articles from the given origins (optionally restricted to one
    /// category), grouped by origin.
    async fn read_list(
        &self,
        _origins: &[String],
        _category: &str,
    ) -> Result<HashMap<String, Vec<Article>>> {
        Err(StorageError::NotImplemented)
    }

    async fn list_by_category(&self, _category: &str) -> Result<Vec<Article>> {
        Err(StorageError::NotImplemented)
    }

    async fn list_by_origin(
        &self,
        _origin: &str,
        _page: usize,
        _size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        Err(StorageError::NotImplemented)
    }

    async fn origins_by_category(&self, _category: &str) -> Result<Vec<String>> {
        Err(StorageError::NotImplemented)
    }

    async fn search(
        &self,
        _keyword: &str,
        _page: usize,
        _size: usize,
    ) -> Result<(Vec<Article>, u64)> {
        Err(StorageError::NotImplemented)
    }

    /// Delete snapshot data beyond the retention window.
    async fn sweep(&self) -> Result<()> {
        Ok(())
    }
}
