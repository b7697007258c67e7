use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepodocError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Generation backend error: {0}")]
    Backend(String),

    #[error("Code structure analysis failed: {0}")]
    Structure(String),

    #[error("Failed to write documentation: {0}")]
    Output(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepodocError>;
