//! Decides whether retrieved evidence is strong enough to answer from

use crate::store::SearchResult;
use tracing::info;

/// Reply used whenever a relevant question cannot be grounded in the index
pub const ESCALATION_MESSAGE: &str = "This is a relevant legal question, but we currently don't have the answer in a document that we can reference. Please kindly create a ticket so we can help you with this issue.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EscalationReason {
    NoResults,
    LowSimilarity { top: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Proceed,
    Escalate(EscalationReason),
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Results are expected in descending similarity order
    pub fn evaluate(&self, results: &[SearchResult]) -> GateDecision {
        let Some(top) = results.first().map(|r| r.similarity) else {
            info!("No search results, escalating");
            return GateDecision::Escalate(EscalationReason::NoResults);
        };

        info!(top_similarity = top, threshold = self.threshold, "Top result similarity");
        if top < self.threshold {
            info!(
                "Low similarity ({:.3} < {}), escalating to ticket",
                top, self.threshold
            );
            return GateDecision::Escalate(EscalationReason::LowSimilarity { top });
        }
        GateDecision::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::store::{chunk_id, ChunkMetadata};

    fn hit(similarity: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                text: "excerpt".into(),
                metadata: ChunkMetadata {
                    doc_id: "1".into(),
                    chunk_id: chunk_id("1", 0),
                    chunk_index: 0,
                    total_chunks: 1,
                    case_name: "Omnicare v. NCS Healthcare".into(),
                    case_name_full: String::new(),
                    date_filed: None,
                    court: "del".into(),
                    citation_count: 0,
                    url: String::new(),
                    author: String::new(),
                },
            },
            distance: 1.0 - similarity,
            similarity,
        }
    }

    #[test]
    fn test_empty_results_escalate() {
        let gate = ConfidenceGate::new(0.3);
        assert_eq!(
            gate.evaluate(&[]),
            GateDecision::Escalate(EscalationReason::NoResults)
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let gate = ConfidenceGate::new(0.3);
        assert_eq!(gate.evaluate(&[hit(0.3)]), GateDecision::Proceed);
        assert_eq!(
            gate.evaluate(&[hit(0.29), hit(0.1)]),
            GateDecision::Escalate(EscalationReason::LowSimilarity { top: 0.29 })
        );
    }
}
