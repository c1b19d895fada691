//! Build command implementation

use crate::chunk::Chunker;
use crate::config::Config;
use crate::document::load_documents;
use crate::embed::{BatchOptions, Embedder};
use crate::error::{Error, Result};
use crate::progress::embedding_progress_bar;
use crate::store::{IndexManifest, VectorIndex};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Case data file (defaults to the configured one)
    pub data_file: Option<PathBuf>,
    /// Only index the first N cases
    pub max_cases: Option<usize>,
    /// Override the configured embedding batch size
    pub batch_size: Option<usize>,
    /// Hide the progress bar
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub data_file: String,
    pub index_dir: String,
    pub documents: usize,
    pub chunks: usize,
    pub manifest: IndexManifest,
}

/// Chunk, embed and persist the case corpus
pub async fn cmd_build(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    options: BuildOptions,
) -> Result<BuildReport> {
    let data_file = options
        .data_file
        .clone()
        .unwrap_or_else(|| config.data_file.clone());

    let mut documents = load_documents(&data_file)?;
    if let Some(max) = options.max_cases {
        if documents.len() > max {
            info!("Limiting to {} cases", max);
            documents.truncate(max);
        }
    }
    if documents.is_empty() {
        return Err(Error::DataValidation(format!(
            "no cases found in {}",
            data_file.display()
        )));
    }

    let chunker = Chunker::new(&config.chunk)?;
    let chunks = chunker.chunk_documents(&documents);
    let chunk_count = chunks.len();

    let batch = BatchOptions {
        batch_size: options.batch_size.unwrap_or(config.embedding.batch_size),
        pause: config.embedding.batch_pause(),
    };
    let model = embedder.model_name().to_string();
    let mut index = VectorIndex::new(config.index_dir.clone(), embedder, batch);

    let progress = (!options.quiet).then(|| embedding_progress_bar(chunk_count as u64, &model));
    let result = index.build(chunks, progress.as_ref()).await;
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    let manifest = result?;

    Ok(BuildReport {
        data_file: data_file.display().to_string(),
        index_dir: config.index_dir.display().to_string(),
        documents: documents.len(),
        chunks: chunk_count,
        manifest,
    })
}

pub fn print_build_report(report: &BuildReport) {
    println!("\n🔨 Index Build Complete\n");
    println!("Data file: {}", report.data_file);
    println!("Index directory: {}", report.index_dir);
    println!("Cases loaded: {}", report.documents);
    println!("Cases indexed: {}", report.manifest.document_count);
    println!("Chunks: {}", report.chunks);
    println!(
        "Embedding model: {} ({} dimensions)",
        report.manifest.embedding_model, report.manifest.dimension
    );
    println!("Built at: {}", report.manifest.created_at.to_rfc3339());
}
