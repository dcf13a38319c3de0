use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Remote timeout: {0}")]
    RemoteTimeout(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Ambiguous classification: {0}")]
    ClassificationAmbiguous(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
