use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend does not support this operation; the facade moves on to
    /// the next backend. Not a failure.
    #[error("not implemented")]
    NotImplemented,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Joined failure of a fan-out write. The cause set is exactly the set of
/// backends that failed; the others committed.
#[derive(Debug, Error)]
#[error("{} backend write(s) failed", failures.len())]
pub struct FanoutError {
    pub failures: Vec<(&'static str, StorageError)>,
}

impl FanoutError {
    pub fn from_failures(failures: Vec<(&'static str, StorageError)>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }
}
