//! Search command implementation

use crate::error::{Error, Result};
use crate::pipeline::{preview, AppContext};
use crate::respond::court_display_name;
use crate::store::RetrievalFilter;
use serde::Serialize;
use tracing::info;

const MAX_K: usize = 20;
const PREVIEW_CHARS: usize = 200;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub k: Option<usize>,
    pub retrieve_k: Option<usize>,
    /// JSON filter, e.g. `{"court": "del"}`
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub chunk_id: String,
    pub case_name: String,
    pub court: String,
    pub date_filed: Option<String>,
    pub similarity: f32,
    pub distance: f32,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub k: usize,
    pub retrieve_k: usize,
    pub hits: Vec<SearchHit>,
}

pub fn parse_filter(raw: &str) -> Result<RetrievalFilter> {
    serde_json::from_str(raw)
        .map_err(|e| Error::DataValidation(format!("invalid filter '{}': {}", raw, e)))
}

/// Raw retrieval without classification or generation
pub async fn cmd_search(ctx: &AppContext, query: &str, options: SearchOptions) -> Result<SearchReport> {
    let retrieval = &ctx.config().retrieval;
    let k = options.k.unwrap_or(retrieval.default_k).clamp(1, MAX_K);
    let retrieve_k = options.retrieve_k.unwrap_or(retrieval.retrieve_k).max(k);
    let filter = options.filter.as_deref().map(parse_filter).transpose()?;

    info!(k, retrieve_k, filtered = filter.is_some(), "Searching: {}", query);
    let results = ctx
        .index()
        .search(query, k, filter.as_ref(), retrieve_k)
        .await?;

    let hits = results
        .into_iter()
        .enumerate()
        .map(|(i, r)| SearchHit {
            rank: i + 1,
            chunk_id: r.chunk.metadata.chunk_id,
            case_name: r.chunk.metadata.case_name,
            court: r.chunk.metadata.court,
            date_filed: r.chunk.metadata.date_filed,
            similarity: r.similarity,
            distance: r.distance,
            preview: preview(&r.chunk.text, PREVIEW_CHARS),
        })
        .collect();

    Ok(SearchReport {
        query: query.to_string(),
        k,
        retrieve_k,
        hits,
    })
}

pub fn print_search_report(report: &SearchReport) {
    println!("\n🔍 Results for: {}\n", report.query);

    if report.hits.is_empty() {
        println!("No matching chunks.");
        return;
    }

    for hit in &report.hits {
        println!(
            "{}. {} [{}] similarity {:.3}",
            hit.rank, hit.case_name, hit.chunk_id, hit.similarity
        );
        println!(
            "   {} · {}",
            court_display_name(&hit.court),
            hit.date_filed.as_deref().unwrap_or("undated")
        );
        println!("   {}", hit.preview);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter(r#"{"court": "del", "date_filed": {"$gte": "2015-01-01"}}"#);
        assert!(filter.is_ok());
        assert!(matches!(
            parse_filter("court=del").unwrap_err(),
            Error::DataValidation(_)
        ));
    }
}
