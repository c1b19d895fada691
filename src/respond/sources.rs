//! Source lists derived from search results

use crate::store::SearchResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cited case as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub case_name: String,
    pub date: String,
    pub court: String,
    pub citation: String,
    pub url: String,
}

/// One result per parent document, most-cited first, at most `max_sources`.
///
/// The first (closest) chunk of each document is kept, and ties in citation
/// count keep retrieval order.
pub fn unique_sources(results: &[SearchResult], max_sources: usize) -> Vec<&SearchResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&SearchResult> = results
        .iter()
        .filter(|r| seen.insert(r.chunk.metadata.doc_id.as_str()))
        .collect();
    unique.sort_by(|a, b| {
        b.chunk
            .metadata
            .citation_count
            .cmp(&a.chunk.metadata.citation_count)
    });
    unique.truncate(max_sources);
    unique
}

pub fn format_sources(results: &[SearchResult], max_sources: usize) -> Vec<SourceRef> {
    unique_sources(results, max_sources)
        .into_iter()
        .map(|r| {
            let meta = &r.chunk.metadata;
            let case_name = if meta.case_name.trim().is_empty() || meta.case_name == "Unknown Case"
            {
                case_name_from_url(&meta.url)
            } else {
                meta.case_name.clone()
            };
            let citation = if meta.case_name_full.trim().is_empty() {
                case_name.clone()
            } else {
                meta.case_name_full.clone()
            };
            SourceRef {
                case_name,
                date: meta.date_filed.clone().unwrap_or_default(),
                court: meta.court.clone(),
                citation,
                url: if meta.url.is_empty() {
                    "#".to_string()
                } else {
                    meta.url.clone()
                },
            }
        })
        .collect()
}

/// Derive a display name from an opinion URL slug.
///
/// `/opinion/123/qian-v-zheng/` becomes `Qian V Zheng`.
pub fn case_name_from_url(url: &str) -> String {
    if !url.contains('/') {
        return "Unknown Case".to_string();
    }
    match url.trim_end_matches('/').rsplit('/').next() {
        Some(slug) if !slug.is_empty() => slug
            .split('-')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        _ => "Unknown Case".to_string(),
    }
}

/// Human-readable court name from a court slug
pub fn court_display_name(court: &str) -> String {
    match court.trim().to_lowercase().as_str() {
        "delaware-supreme" | "del" => "Delaware Supreme Court".to_string(),
        "delaware-chancery" | "delch" => "Delaware Court of Chancery".to_string(),
        "delaware" => "Delaware Courts".to_string(),
        _ => title_case(&court.replace('-', " ")),
    }
}

pub fn title_case(text: &str) -> String {
    text.split(' ').map(capitalize).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
