//! Metadata stored with each vector in the index

use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Provenance of a single chunk, positionally aligned with its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Parent document ID
    pub doc_id: String,

    /// `{doc_id}_chunk_{index}`
    pub chunk_id: String,

    /// Chunk index within the document (0-based)
    pub chunk_index: usize,

    /// Number of chunks the document produced
    pub total_chunks: usize,

    pub case_name: String,

    #[serde(default)]
    pub case_name_full: String,

    /// Filing date as ISO `YYYY-MM-DD` when known
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date_filed: Option<String>,

    #[serde(default)]
    pub court: String,

    #[serde(default)]
    pub citation_count: u64,

    /// Relative opinion URL
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub author: String,
}

impl ChunkMetadata {
    pub fn for_document(doc: &Document, chunk_index: usize, total_chunks: usize) -> Self {
        Self {
            doc_id: doc.id.clone(),
            chunk_id: chunk_id(&doc.id, chunk_index),
            chunk_index,
            total_chunks,
            case_name: doc.case_name.clone(),
            case_name_full: doc.case_name_full.clone(),
            date_filed: doc.date_filed.clone(),
            court: doc.court.clone(),
            citation_count: doc.citation_count,
            url: doc.absolute_url.clone(),
            author: doc.author.clone(),
        }
    }

    /// Look up a field by name for filtering.
    ///
    /// Unknown names and absent optional values yield `None`.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "doc_id" | "case_id" => FieldValue::Text(self.doc_id.clone()),
            "chunk_id" => FieldValue::Text(self.chunk_id.clone()),
            "chunk_index" => FieldValue::Integer(self.chunk_index as i64),
            "total_chunks" => FieldValue::Integer(self.total_chunks as i64),
            "case_name" => FieldValue::Text(self.case_name.clone()),
            "case_name_full" => FieldValue::Text(self.case_name_full.clone()),
            "date_filed" => FieldValue::Text(self.date_filed.clone()?),
            "court" => FieldValue::Text(self.court.clone()),
            "citation_count" => FieldValue::Integer(self.citation_count as i64),
            "url" | "absolute_url" => FieldValue::Text(self.url.clone()),
            "author" => FieldValue::Text(self.author.clone()),
            _ => return None,
        };
        Some(value)
    }
}

pub fn chunk_id(doc_id: &str, chunk_index: usize) -> String {
    format!("{}_chunk_{}", doc_id, chunk_index)
}

/// A scalar metadata value as seen by retrieval filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Ordering between values of the same kind; `None` across kinds
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        serde_json::from_value(serde_json::json!({
            "id": 4512,
            "case_name": "Aronson v. Lewis",
            "case_name_full": "Harry Aronson v. Harry Lewis",
            "date_filed": "1984-03-01",
            "court": "del",
            "citation_count": 812,
            "absolute_url": "/opinion/4512/aronson-v-lewis/",
            "author_str": "Moore"
        }))
        .unwrap()
    }

    #[test]
    fn test_metadata_from_document() {
        let meta = ChunkMetadata::for_document(&sample_document(), 2, 5);
        assert_eq!(meta.doc_id, "4512");
        assert_eq!(meta.chunk_id, "4512_chunk_2");
        assert_eq!(meta.total_chunks, 5);
        assert_eq!(meta.url, "/opinion/4512/aronson-v-lewis/");
        assert_eq!(meta.author, "Moore");
    }

    #[test]
    fn test_field_lookup() {
        let mut meta = ChunkMetadata::for_document(&sample_document(), 0, 1);
        assert_eq!(meta.field("court"), Some(FieldValue::Text("del".into())));
        assert_eq!(meta.field("citation_count"), Some(FieldValue::Integer(812)));
        assert_eq!(meta.field("no_such_field"), None);

        meta.date_filed = None;
        assert_eq!(meta.field("date_filed"), None);
    }

    #[test]
    fn test_compare_across_kinds_is_undefined() {
        let text = FieldValue::Text("2015-01-01".into());
        let int = FieldValue::Integer(2015);
        assert_eq!(text.compare(&int), None);
        assert_eq!(
            FieldValue::Text("2016-05-01".into()).compare(&text),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_metadata_jsonl_shape() {
        let meta = ChunkMetadata::for_document(&sample_document(), 0, 1);
        let line = serde_json::to_string(&meta).unwrap();
        let parsed: ChunkMetadata = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, meta);
    }
}
