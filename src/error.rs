//! Custom error types for docket

use thiserror::Error;

/// Main error type for docket operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Index not loaded: build or load an index first{}", path_suffix(.0))]
    IndexNotLoaded(Option<String>),

    #[error("Index files not found at: {0}")]
    IndexNotFound(String),

    #[error(
        "Index dimension mismatch: index has {actual}, model '{model}' produces {expected}"
    )]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        model: String,
    },

    #[error("Embedding generation failed (model {model}, batch {batch}): {message}")]
    EmbeddingGeneration {
        message: String,
        model: String,
        batch: String,
    },

    #[error("LLM generation failed (model {model}): {message}")]
    LlmGeneration { message: String, model: String },

    #[error("LLM API rate limit exceeded{}", retry_suffix(.retry_after_secs))]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    #[error("Data file not found: {0}")]
    DataNotFound(String),

    #[error("Data validation failed: {0}")]
    DataValidation(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_ref()
        .map(|p| format!(" (index_path={})", p))
        .unwrap_or_default()
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|s| format!(" (retry after {}s)", s))
        .unwrap_or_default()
}

impl Error {
    /// Embedding failure that is not tied to a specific build batch
    pub fn embedding(model: &str, message: impl Into<String>) -> Self {
        Error::EmbeddingGeneration {
            message: message.into(),
            model: model.to_string(),
            batch: "query".to_string(),
        }
    }

    /// HTTP-style status code for shells that expose the pipeline over a wire protocol
    pub fn status_code(&self) -> u16 {
        match self {
            Error::IndexNotLoaded(_) | Error::IndexNotFound(_) => 503,
            Error::RateLimitExceeded { .. } => 429,
            Error::DataNotFound(_) => 404,
            Error::DataValidation(_) => 400,
            _ => 500,
        }
    }

    /// Structural unavailability: the index cannot serve queries at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::IndexNotLoaded(_) | Error::IndexNotFound(_) | Error::DimensionMismatch { .. }
        )
    }
}

/// Result type alias for docket
pub type Result<T> = std::result::Result<T, Error>;
