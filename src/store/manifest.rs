//! Index manifest describing a persisted build

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Only exact flat L2 search is supported
pub const INDEX_KIND: &str = "flat-l2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub vector_count: usize,
    pub chunk_count: usize,
    /// Number of distinct parent documents
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
    pub index_kind: String,
    pub format_version: u32,
    /// blake3 hex digest of `vectors.bin`
    pub vectors_checksum: String,
}
