//! Case law documents as produced by the extraction step

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// A court opinion with its display metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    #[serde(default = "unknown_case", deserialize_with = "case_name_or_unknown")]
    pub case_name: String,

    #[serde(default, deserialize_with = "string_or_default")]
    pub case_name_full: String,

    #[serde(default, deserialize_with = "non_empty_string")]
    pub date_filed: Option<String>,

    #[serde(default, deserialize_with = "string_or_default")]
    pub court: String,

    #[serde(default, deserialize_with = "string_or_default")]
    pub plain_text: String,

    #[serde(default, deserialize_with = "count_or_zero")]
    pub citation_count: u64,

    #[serde(default, deserialize_with = "string_or_default")]
    pub absolute_url: String,

    #[serde(default, alias = "author_str", deserialize_with = "string_or_default")]
    pub author: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

fn unknown_case() -> String {
    "Unknown Case".to_string()
}

fn case_name_or_unknown<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(unknown_case))
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "document id must be a non-empty string or number, got {}",
            other
        ))),
    }
}

// Extractors emit `null` for absent fields as often as they omit them.
fn string_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

fn count_or_zero<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Load the JSON array of documents written by the extraction step
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    info!("Loading cases from {}", path.display());

    if !path.exists() {
        return Err(Error::DataNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let raw: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
        Error::DataValidation(format!(
            "{} is not a JSON array of cases: {}",
            path.display(),
            e
        ))
    })?;

    let documents = raw
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            serde_json::from_value::<Document>(value).map_err(|e| {
                Error::DataValidation(format!("case at position {}: {}", position, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} case records", documents.len());
    info!("Loaded {} cases", documents.len());
    Ok(documents)
}
