//! Metadata filters applied to search candidates

use super::payload::{ChunkMetadata, FieldValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Conjunction of per-field conditions.
///
/// Deserializes from `{"court": "del", "date_filed": {"$gte": "2015-01-01"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalFilter {
    conditions: BTreeMap<String, Condition>,
}

/// A single field condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Range(RangeBounds),
    Exact(FieldValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeBounds {
    #[serde(rename = "$gte", default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<FieldValue>,
    #[serde(rename = "$lte", default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<FieldValue>,
    #[serde(rename = "$gt", default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<FieldValue>,
    #[serde(rename = "$lt", default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<FieldValue>,
}

impl RetrievalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn eq(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.conditions.insert(field.into(), Condition::Exact(value));
        self
    }

    /// Require `field` to fall within `bounds`
    pub fn range(mut self, field: impl Into<String>, bounds: RangeBounds) -> Self {
        self.conditions.insert(field.into(), Condition::Range(bounds));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            metadata
                .field(field)
                .is_some_and(|value| condition.accepts(&value))
        })
    }
}

impl Condition {
    fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            Condition::Exact(expected) => value.compare(expected) == Some(Ordering::Equal),
            Condition::Range(bounds) => bounds.accepts(value),
        }
    }
}

impl RangeBounds {
    fn accepts(&self, value: &FieldValue) -> bool {
        let check = |bound: &Option<FieldValue>, ok: fn(Ordering) -> bool| match bound {
            Some(bound) => value.compare(bound).is_some_and(ok),
            None => true,
        };

        check(&self.gte, |o| o != Ordering::Less)
            && check(&self.lte, |o| o != Ordering::Greater)
            && check(&self.gt, |o| o == Ordering::Greater)
            && check(&self.lt, |o| o == Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(court: &str, date: Option<&str>, citations: u64) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: "1".into(),
            chunk_id: "1_chunk_0".into(),
            chunk_index: 0,
            total_chunks: 1,
            case_name: "Smith v. Van Gorkom".into(),
            case_name_full: String::new(),
            date_filed: date.map(str::to_string),
            court: court.into(),
            citation_count: citations,
            url: String::new(),
            author: String::new(),
        }
    }

    #[test]
    fn test_deserialize_mixed_conditions() {
        let filter: RetrievalFilter = serde_json::from_str(
            r#"{"court": "del", "date_filed": {"$gte": "2015-01-01"}, "citation_count": {"$gt": 10}}"#,
        )
        .unwrap();

        assert!(filter.matches(&metadata("del", Some("2016-02-03"), 11)));
        assert!(!filter.matches(&metadata("delch", Some("2016-02-03"), 11)));
        assert!(!filter.matches(&metadata("del", Some("2014-12-31"), 11)));
        assert!(!filter.matches(&metadata("del", Some("2016-02-03"), 10)));
    }

    #[test]
    fn test_missing_field_rejects() {
        let filter = RetrievalFilter::new().range(
            "date_filed",
            RangeBounds {
                gte: Some(FieldValue::Text("2015-01-01".into())),
                ..Default::default()
            },
        );
        assert!(!filter.matches(&metadata("del", None, 0)));

        let filter = RetrievalFilter::new().eq("judge", FieldValue::Text("Strine".into()));
        assert!(!filter.matches(&metadata("del", Some("2020-01-01"), 0)));
    }

    #[test]
    fn test_type_mismatch_rejects() {
        let filter = RetrievalFilter::new().eq("citation_count", FieldValue::Text("5".into()));
        assert!(!filter.matches(&metadata("del", None, 5)));

        let filter = RetrievalFilter::new().eq("citation_count", FieldValue::Integer(5));
        assert!(filter.matches(&metadata("del", None, 5)));
    }

    #[test]
    fn test_inclusive_and_exclusive_bounds() {
        let bounds: RangeBounds =
            serde_json::from_str(r#"{"$gte": "2015-01-01", "$lt": "2016-01-01"}"#).unwrap();
        let filter = RetrievalFilter::new().range("date_filed", bounds);

        assert!(filter.matches(&metadata("del", Some("2015-01-01"), 0)));
        assert!(filter.matches(&metadata("del", Some("2015-12-31"), 0)));
        assert!(!filter.matches(&metadata("del", Some("2016-01-01"), 0)));
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter: RetrievalFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&metadata("", None, 0)));
    }
}
