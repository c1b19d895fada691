//! Exact vector index over chunk embeddings
//!
//! This module provides:
//! - Batched index builds from chunks
//! - All-or-nothing persistence and validated loading
//! - Brute-force squared-L2 search with metadata filtering

mod filter;
mod manifest;
mod payload;
mod storage;

pub use filter::*;
pub use manifest::*;
pub use payload::*;
pub use storage::{FORMAT_VERSION, MANIFEST_FILE, METADATA_FILE, VECTORS_FILE};

use crate::chunk::Chunk;
use crate::config::Config;
use crate::embed::{embed_in_batches, normalize_embedding, BatchOptions, Embedder};
use crate::error::{Error, Result};
use chrono::Utc;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A search hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Squared L2 distance between unit vectors
    pub distance: f32,
    /// `1 - distance`, clamped to [0, 1]
    pub similarity: f32,
}

/// Loaded index contents, never mutated after construction
#[derive(Debug)]
struct IndexData {
    manifest: IndexManifest,
    dimension: usize,
    /// Row-major, `chunks.len() * dimension` values
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl IndexData {
    fn vector(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

/// Vector index handle
#[derive(Clone)]
pub struct VectorIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    batch: BatchOptions,
    data: Option<Arc<IndexData>>,
}

impl VectorIndex {
    pub fn new(dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>, batch: BatchOptions) -> Self {
        Self {
            dir: dir.into(),
            embedder,
            batch,
            data: None,
        }
    }

    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            config.index_dir.clone(),
            embedder,
            BatchOptions {
                batch_size: config.embedding.batch_size,
                pause: config.embedding.batch_pause(),
            },
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Number of stored vectors (0 when not loaded)
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.data.as_ref().map(|d| &d.manifest)
    }

    /// Embed every chunk, persist the result and make it the loaded index.
    ///
    /// Nothing is written unless every batch succeeds.
    pub async fn build(
        &mut self,
        chunks: Vec<Chunk>,
        progress: Option<&ProgressBar>,
    ) -> Result<IndexManifest> {
        if chunks.is_empty() {
            return Err(Error::DataValidation("no chunks to index".to_string()));
        }

        let model = self.embedder.model_name().to_string();
        let dimension = self.embedder.dimension();
        info!(chunks = chunks.len(), model = %model, "Building vector index");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), texts, self.batch, progress).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::DataValidation(format!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut vectors = Vec::with_capacity(chunks.len() * dimension);
        for embedding in &embeddings {
            if embedding.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                    model,
                });
            }
            vectors.extend_from_slice(embedding);
        }

        let document_count = chunks
            .iter()
            .map(|c| c.metadata.doc_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let bytes = storage::encode_vectors(dimension, &vectors);
        let manifest = IndexManifest {
            embedding_model: model,
            dimension,
            vector_count: chunks.len(),
            chunk_count: chunks.len(),
            document_count,
            created_at: Utc::now(),
            index_kind: INDEX_KIND.to_string(),
            format_version: FORMAT_VERSION,
            vectors_checksum: storage::checksum(&bytes),
        };

        storage::write_index(&self.dir, &manifest, &bytes, &chunks)?;
        info!(
            vectors = manifest.vector_count,
            documents = manifest.document_count,
            path = %self.dir.display(),
            "Index saved"
        );

        self.data = Some(Arc::new(IndexData {
            manifest: manifest.clone(),
            dimension,
            vectors,
            chunks,
        }));
        Ok(manifest)
    }

    /// Load and validate the persisted index
    pub fn load(&mut self) -> Result<&IndexManifest> {
        let missing = storage::missing_files(&self.dir);
        if !missing.is_empty() {
            debug!(missing = ?missing, "Index artifacts missing");
            return Err(Error::IndexNotFound(self.dir.display().to_string()));
        }

        let manifest = storage::read_manifest(&self.dir)?;
        let expected = self.embedder.dimension();
        if manifest.dimension != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: manifest.dimension,
                model: self.embedder.model_name().to_string(),
            });
        }
        if manifest.embedding_model != self.embedder.model_name() {
            warn!(
                index_model = %manifest.embedding_model,
                configured_model = %self.embedder.model_name(),
                "Index was built with a different embedding model"
            );
        }

        let (dimension, count, vectors) = storage::read_vectors(&self.dir, &manifest)?;
        if dimension != manifest.dimension || count != manifest.vector_count {
            return Err(Error::DataValidation(format!(
                "vector header ({} x {}) disagrees with manifest ({} x {})",
                count, dimension, manifest.vector_count, manifest.dimension
            )));
        }

        let chunks = storage::read_chunks(&self.dir)?;
        if chunks.len() != count || manifest.chunk_count != count {
            return Err(Error::DataValidation(format!(
                "metadata has {} records, manifest lists {} chunks, vectors {}",
                chunks.len(),
                manifest.chunk_count,
                count
            )));
        }

        info!(vectors = count, path = %self.dir.display(), "Loaded index");
        let data = self.data.insert(Arc::new(IndexData {
            manifest,
            dimension,
            vectors,
            chunks,
        }));
        Ok(&data.manifest)
    }

    /// Embed `query` and return up to `k` filtered nearest chunks.
    ///
    /// The nearest `retrieve_k` candidates are filtered in distance order,
    /// so fewer than `k` results may come back.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&RetrievalFilter>,
        retrieve_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if self.data.is_none() {
            return Err(self.not_loaded());
        }
        let embedding = self.embedder.embed_query(query).await?;
        self.search_vector(&normalize_embedding(&embedding), k, filter, retrieve_k)
    }

    /// Search with an already-normalised query vector
    pub fn search_vector(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&RetrievalFilter>,
        retrieve_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let data = self.data.as_ref().ok_or_else(|| self.not_loaded())?;
        if query.len() != data.dimension {
            return Err(Error::DimensionMismatch {
                expected: data.dimension,
                actual: query.len(),
                model: data.manifest.embedding_model.clone(),
            });
        }
        if k == 0 || data.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(f32, usize)> = (0..data.chunks.len())
            .map(|i| (squared_l2(query, data.vector(i)), i))
            .collect();

        let fetch = retrieve_k.max(k).min(candidates.len());
        let by_distance =
            |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if fetch < candidates.len() {
            candidates.select_nth_unstable_by(fetch, by_distance);
            candidates.truncate(fetch);
        }
        candidates.sort_by(by_distance);

        let results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|(_, i)| filter.map_or(true, |f| f.matches(&data.chunks[*i].metadata)))
            .take(k)
            .map(|(distance, i)| SearchResult {
                chunk: data.chunks[i].clone(),
                distance,
                similarity: (1.0 - distance).clamp(0.0, 1.0),
            })
            .collect();

        debug!(
            results = results.len(),
            requested = k,
            candidates = fetch,
            top_similarity = results.first().map(|r| r.similarity),
            "Search complete"
        );
        Ok(results)
    }

    fn not_loaded(&self) -> Error {
        Error::IndexNotLoaded(Some(self.dir.display().to_string()))
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dir", &self.dir)
            .field("model", &self.embedder.model_name())
            .field("vectors", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbedder;
    use std::time::Duration;
    use tempfile::TempDir;

    fn chunk(doc_id: &str, index: usize, text: &str, court: &str, date: Option<&str>) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                doc_id: doc_id.to_string(),
                chunk_id: chunk_id(doc_id, index),
                chunk_index: index,
                total_chunks: 1,
                case_name: format!("Case {}", doc_id),
                case_name_full: String::new(),
                date_filed: date.map(str::to_string),
                court: court.to_string(),
                citation_count: 0,
                url: String::new(),
                author: String::new(),
            },
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("1", 0, "fiduciary duty of loyalty", "del", Some("2010-05-01")),
            chunk("2", 0, "business judgment rule presumption", "del", Some("2016-03-02")),
            chunk("3", 0, "appraisal of fair value", "delch", Some("2018-07-09")),
            chunk("4", 0, "fiduciary duty of care", "delch", None),
            chunk("5", 0, "merger litigation settlement", "del", Some("2020-11-30")),
        ]
    }

    fn index(dir: &Path, embedder: FakeEmbedder) -> VectorIndex {
        VectorIndex::new(
            dir,
            Arc::new(embedder),
            BatchOptions {
                batch_size: 2,
                pause: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_build_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        let chunks = corpus();

        let mut built = index(&dir, FakeEmbedder::new(16));
        let manifest = built.build(chunks.clone(), None).await.unwrap();
        assert_eq!(manifest.vector_count, 5);
        assert_eq!(manifest.document_count, 5);

        let mut loaded = index(&dir, FakeEmbedder::new(16));
        let loaded_manifest = loaded.load().unwrap().clone();
        assert_eq!(loaded_manifest, manifest);
        assert_eq!(loaded.len(), 5);

        let original = built.data.as_ref().unwrap();
        let restored = loaded.data.as_ref().unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(&restored.chunks[i], chunk);
            assert_eq!(restored.vector(i), original.vector(i));
        }
    }

    #[tokio::test]
    async fn test_search_is_deterministic_and_ranked() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(256));
        idx.build(corpus(), None).await.unwrap();

        let first = idx.search("fiduciary duty of loyalty", 3, None, 20).await.unwrap();
        let second = idx.search("fiduciary duty of loyalty", 3, None, 20).await.unwrap();

        let ids = |r: &[SearchResult]| -> Vec<String> {
            r.iter().map(|x| x.chunk.metadata.chunk_id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first[0].chunk.metadata.doc_id, "1");
        assert!((first[0].similarity - 1.0).abs() < 1e-5);
        assert!(first.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_ties_break_by_position() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(8));
        let chunks = vec![
            chunk("a", 0, "same text", "del", None),
            chunk("b", 0, "same text", "del", None),
            chunk("c", 0, "same text", "del", None),
        ];
        idx.build(chunks, None).await.unwrap();

        let results = idx.search("same text", 3, None, 3).await.unwrap();
        let docs: Vec<&str> = results.iter().map(|r| r.chunk.metadata.doc_id.as_str()).collect();
        assert_eq!(docs, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_filter_applies_after_over_fetch() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(256));
        idx.build(corpus(), None).await.unwrap();

        let filter: RetrievalFilter =
            serde_json::from_str(r#"{"date_filed": {"$gte": "2015-01-01"}}"#).unwrap();
        let results = idx
            .search("fiduciary duty", 5, Some(&filter), 20)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for r in &results {
            assert!(r.chunk.metadata.date_filed.as_deref().unwrap() >= "2015-01-01");
        }

        // Only two candidates are fetched, neither of which passes.
        let narrow = idx
            .search("fiduciary duty", 2, Some(&filter), 2)
            .await
            .unwrap();
        assert!(narrow.is_empty());
    }

    #[tokio::test]
    async fn test_search_before_load_fails() {
        let tmp = TempDir::new().unwrap();
        let idx = index(tmp.path(), FakeEmbedder::new(8));
        let err = idx.search("anything", 4, None, 20).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotLoaded(Some(_))));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(8));
        idx.build(corpus(), None).await.unwrap();

        let err = idx.search_vector(&[1.0, 0.0], 4, None, 20).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 8,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_load_missing_index() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(&tmp.path().join("nowhere"), FakeEmbedder::new(8));
        assert!(matches!(idx.load().unwrap_err(), Error::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_with_other_dimension() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(8));
        idx.build(corpus(), None).await.unwrap();

        let mut other = index(tmp.path(), FakeEmbedder::new(16));
        assert!(matches!(
            other.load().unwrap_err(),
            Error::DimensionMismatch {
                expected: 16,
                actual: 8,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_tampered_vectors_fail_checksum() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(8));
        idx.build(corpus(), None).await.unwrap();

        let path = tmp.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut reloaded = index(tmp.path(), FakeEmbedder::new(8));
        assert!(matches!(
            reloaded.load().unwrap_err(),
            Error::DataValidation(_)
        ));
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");

        let mut idx = index(&dir, FakeEmbedder::new(8));
        let original = idx.build(corpus(), None).await.unwrap();

        let mut failing = index(&dir, FakeEmbedder::new(8).failing_on_call(2));
        let err = failing.build(corpus(), None).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingGeneration { .. }));
        assert!(!failing.is_loaded());

        let mut reloaded = index(&dir, FakeEmbedder::new(8));
        assert_eq!(reloaded.load().unwrap(), &original);
    }

    #[tokio::test]
    async fn test_build_rejects_empty_input() {
        let tmp = TempDir::new().unwrap();
        let mut idx = index(tmp.path(), FakeEmbedder::new(8));
        assert!(matches!(
            idx.build(Vec::new(), None).await.unwrap_err(),
            Error::DataValidation(_)
        ));
        assert!(storage::missing_files(tmp.path()).len() == 3);
    }
}
