//! Default values for configuration

use std::path::PathBuf;

/// Default embedding model (OpenAI text-embedding-3-small)
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default embedding dimension (matches text-embedding-3-small)
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default embedding backend URL (OpenAI-compatible)
pub fn default_embedding_url() -> String {
    std::env::var("DOCKET_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// Default environment variable holding the API key
pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    100
}

/// Default pause between embedding batches during a build
pub fn default_embedding_batch_pause_ms() -> u64 {
    0
}

/// Default request timeout for external calls in seconds
pub fn default_timeout_secs() -> u64 {
    30
}

/// Default retry count for embedding requests
pub fn default_embedding_max_retries() -> usize {
    2
}

/// Default language model for classification and generation
pub fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

/// Default language model backend URL (OpenAI-compatible)
pub fn default_llm_url() -> String {
    std::env::var("DOCKET_LLM_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// Default sampling temperature
pub fn default_llm_temperature() -> f32 {
    0.0
}

/// Default language model timeout (generation is slower than embedding)
pub fn default_llm_timeout_secs() -> u64 {
    60
}

/// Default target characters per chunk
pub fn default_chunk_size() -> usize {
    1000
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    200
}

/// Documents with less text than this contribute no chunks
pub fn default_min_text_chars() -> usize {
    100
}

/// Default number of chunks handed to the synthesizer
pub fn default_retrieval_k() -> usize {
    4
}

/// Default over-fetch size before filtering
pub fn default_retrieve_k() -> usize {
    20
}

/// Minimum top similarity for an automatic answer
pub fn default_similarity_threshold() -> f32 {
    0.3
}

/// Default maximum sources in a response
pub fn default_max_sources() -> usize {
    3
}

/// Keyword score above which queries skip the language model and are accepted
pub fn default_accept_threshold() -> f32 {
    0.7
}

/// Keyword score below which queries skip the language model and are rejected
pub fn default_reject_threshold() -> f32 {
    0.1
}

/// Keyword score needed to accept when the language model is unavailable
pub fn default_fallback_threshold() -> f32 {
    0.3
}

/// Default index directory
pub fn default_index_dir() -> PathBuf {
    PathBuf::from("./index")
}

/// Default case law data file
pub fn default_data_file() -> PathBuf {
    PathBuf::from("./data/cases/delaware_cases.json")
}

/// Default log level
pub fn default_log_level() -> String {
    "info".to_string()
}
