use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoonshotError>;

#[derive(Debug, Error)]
pub enum MoonshotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty completion in response")]
    EmptyCompletion,
}

impl From<reqwest::Error> for MoonshotError {
    fn from(err: reqwest::Error) -> Self {
        MoonshotError::Network(err.to_string())
    }
}
