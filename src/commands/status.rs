//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{AppContext, StatusReport};
use crate::store::IndexManifest;
use serde::Serialize;
use tracing::{debug, info};

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub index_dir: String,
    pub embedding_model: String,
    pub llm_model: String,
    #[serde(flatten)]
    pub report: StatusReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<IndexManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

/// Get system status, attempting to load the index
pub fn cmd_status(config: &Config) -> Result<StatusInfo> {
    info!("Getting status");

    let mut ctx = AppContext::from_config(config.clone())?;
    let load_error = match ctx.load_index() {
        Ok(_) => None,
        Err(e) => {
            debug!("Index load failed: {}", e);
            Some(e.to_string())
        }
    };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        index_dir: config.index_dir.display().to_string(),
        embedding_model: config.embedding.model.clone(),
        llm_model: config.llm.model.clone(),
        report: ctx.status(),
        manifest: ctx.index().manifest().cloned(),
        load_error,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 docket Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Index: {}", status.index_dir);
    println!("Embedding model: {}", status.embedding_model);
    println!("Language model: {}", status.llm_model);

    println!("\nIndex:");
    if status.report.index_loaded {
        println!("  Status: ✓ Loaded");
    } else {
        println!("  Status: ✗ Not loaded (run 'docket build' to create it)");
    }
    if let Some(err) = &status.load_error {
        println!("  Error: {}", err);
    }
    println!("  Vectors: {}", status.report.vectors);

    if let Some(manifest) = &status.manifest {
        println!("  Cases: {}", manifest.document_count);
        println!(
            "  Built with: {} ({} dimensions)",
            manifest.embedding_model, manifest.dimension
        );
        println!("  Built at: {}", manifest.created_at.to_rfc3339());
        println!("  Kind: {} (format v{})", manifest.index_kind, manifest.format_version);
    }
}
