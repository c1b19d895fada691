//! Configuration management for docket
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persisted vector index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// JSON file with extracted case law documents
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Query classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// OpenAI-compatible base URL
    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Pause between batches during a build (milliseconds)
    #[serde(default = "default_embedding_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for a failed embedding request
    #[serde(default = "default_embedding_max_retries")]
    pub max_retries: usize,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension, self.model, expected, expected
                );
            }
            expected
        } else {
            self.dimension
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Get the API key from environment
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// OpenAI-compatible base URL
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the API key from environment
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

fn read_api_key(env_name: &str) -> Option<String> {
    if env_name.is_empty() {
        return None;
    }
    std::env::var(env_name).ok().filter(|k| !k.trim().is_empty())
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap characters between chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,

    /// Minimum document text length worth chunking
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    #[serde(default = "default_retrieval_k")]
    pub default_k: usize,

    /// Candidates fetched before filtering
    #[serde(default = "default_retrieve_k")]
    pub retrieve_k: usize,

    /// Minimum top similarity before escalating (0.0 - 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum unique sources in a response
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

/// Query classifier thresholds on the keyword score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f32,

    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f32,

    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: f32,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for docket data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            data_file: default_data_file(),
            log_level: default_log_level(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            classifier: ClassifierConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: default_embedding_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_embedding_batch_size(),
            batch_pause_ms: default_embedding_batch_pause_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_embedding_max_retries(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_llm_url(),
            api_key_env: default_api_key_env(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_retrieval_k(),
            retrieve_k: default_retrieve_k(),
            similarity_threshold: default_similarity_threshold(),
            max_sources: default_max_sources(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            reject_threshold: default_reject_threshold(),
            fallback_threshold: default_fallback_threshold(),
        }
    }
}

impl Config {
    /// Get the default base directory for docket (~/.docket)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docket")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration rooted at `base_dir`
    pub fn init(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);
        config.index_dir = config.paths.base_dir.join("index");
        config.save()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let chunk = &self.chunk;
        if !(100..=2000).contains(&chunk.chunk_size) {
            return Err(Error::Config(
                "chunk.chunk_size must be between 100 and 2000".to_string(),
            ));
        }

        if chunk.overlap > 500 {
            return Err(Error::Config("chunk.overlap must be <= 500".to_string()));
        }

        if chunk.overlap >= chunk.chunk_size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.chunk_size".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        let retrieval = &self.retrieval;
        if !(1..=20).contains(&retrieval.default_k) {
            return Err(Error::Config(
                "retrieval.default_k must be between 1 and 20".to_string(),
            ));
        }

        if retrieval.retrieve_k < retrieval.default_k {
            return Err(Error::Config(
                "retrieval.retrieve_k must be >= retrieval.default_k".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&retrieval.similarity_threshold) {
            return Err(Error::Config(
                "retrieval.similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if retrieval.max_sources == 0 {
            return Err(Error::Config(
                "retrieval.max_sources must be positive".to_string(),
            ));
        }

        let classifier = &self.classifier;
        for (name, value) in [
            ("accept_threshold", classifier.accept_threshold),
            ("reject_threshold", classifier.reject_threshold),
            ("fallback_threshold", classifier.fallback_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "classifier.{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if classifier.reject_threshold >= classifier.accept_threshold {
            return Err(Error::Config(
                "classifier.reject_threshold must be < classifier.accept_threshold".to_string(),
            ));
        }

        Ok(())
    }
}
