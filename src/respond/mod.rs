//! Grounded answer generation from retrieved excerpts

mod sources;

pub use sources::*;

use crate::llm::LanguageModel;
use crate::store::SearchResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

const SYSTEM_PROMPT: &str = "You are an expert legal assistant specializing in Delaware corporate law.

Answer questions about Delaware corporate law using only the provided case law excerpts.

GUIDELINES:
1. Base your answer on the provided excerpts
2. Explain legal concepts clearly and concisely
3. Cite specific cases when making legal points in the text
4. Use proper legal terminology
5. If the excerpts don't fully answer the question, acknowledge the limitations
6. Structure your response clearly

RESPONSE STRUCTURE:
1. Direct answer to the question
2. Legal explanation with case support
3. Key precedents or standards
4. Practical implications (if relevant)

CITATION FORMAT:
- Reference cases naturally in your text: \"In Smith v. Van Gorkom, the court held...\"
- Do NOT include a separate citations section at the end (sources are provided separately)

Be professional and accurate. If you're uncertain, say so.";

pub const GENERATION_ERROR_MESSAGE: &str =
    "I encountered an error generating a response. Please try again.";

pub const NO_RESULTS_MESSAGE: &str = "I couldn't find relevant case law to answer your question. Please try rephrasing or ask about a different topic.";

const SOURCE_MARKERS: [&str; 3] = ["**Sources:**", "**Citations:**", "**References:**"];

/// Confidence bucket attached to an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
    Error,
}

impl Confidence {
    /// Bucket the mean similarity of the chunks an answer was built from
    pub fn from_similarities(results: &[SearchResult]) -> Self {
        if results.is_empty() {
            return Confidence::Low;
        }
        let mean = results.iter().map(|r| r.similarity).sum::<f32>() / results.len() as f32;
        if mean > 0.8 {
            Confidence::High
        } else if mean > 0.6 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
            Confidence::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: Confidence,
    pub chunks_used: usize,
}

pub struct ResponseSynthesizer {
    llm: Arc<dyn LanguageModel>,
    max_sources: usize,
}

impl ResponseSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, max_sources: usize) -> Self {
        Self { llm, max_sources }
    }

    /// Answer `question` from `results`.
    ///
    /// Generation failures produce an apology with [`Confidence::Error`]
    /// rather than an error value.
    pub async fn synthesize(
        &self,
        question: &str,
        results: &[SearchResult],
        include_sources: bool,
    ) -> SynthesizedResponse {
        if results.is_empty() {
            return SynthesizedResponse {
                answer: NO_RESULTS_MESSAGE.to_string(),
                sources: Vec::new(),
                confidence: Confidence::Low,
                chunks_used: 0,
            };
        }

        let prompt = format!(
            "Question: {}\n\nRelevant Case Law Excerpts:\n{}\n\nPlease provide a comprehensive answer based on these excerpts.",
            question,
            format_context(results)
        );

        let answer = match self.llm.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, model = self.llm.model_name(), "Error generating response");
                return SynthesizedResponse {
                    answer: GENERATION_ERROR_MESSAGE.to_string(),
                    sources: Vec::new(),
                    confidence: Confidence::Error,
                    chunks_used: 0,
                };
            }
        };

        let (answer, sources) = if include_sources {
            let answer = append_sources_section(answer, &unique_sources(results, self.max_sources));
            (answer, format_sources(results, self.max_sources))
        } else {
            (answer, Vec::new())
        };

        let confidence = Confidence::from_similarities(results);
        info!(chunks = results.len(), confidence = %confidence, "Generated response");

        SynthesizedResponse {
            answer,
            sources,
            confidence,
            chunks_used: results.len(),
        }
    }
}

/// Render results as numbered excerpt blocks separated by `---`
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let meta = &r.chunk.metadata;
            format!(
                "\n[Excerpt {}]\nCase: {}\nDate: {}\nCourt: {}\n\n{}\n",
                i + 1,
                meta.case_name,
                meta.date_filed.as_deref().unwrap_or("Unknown Date"),
                if meta.court.is_empty() {
                    "Unknown Court"
                } else {
                    meta.court.as_str()
                },
                r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn append_sources_section(answer: String, sources: &[&SearchResult]) -> String {
    if sources.is_empty() || SOURCE_MARKERS.iter().any(|m| answer.contains(m)) {
        return answer;
    }

    let mut section = String::from("\n\n---\n\n**Sources:**\n\n");
    for (i, source) in sources.iter().enumerate() {
        let meta = &source.chunk.metadata;
        section.push_str(&format!(
            "{}. **{}** ({}, {})\n",
            i + 1,
            meta.case_name,
            title_case(&meta.court.replace('-', " ")),
            meta.date_filed.as_deref().unwrap_or("")
        ));
        if !meta.url.is_empty() {
            section.push_str(&format!("   [View Case]({})\n", meta.url));
        }
        section.push('\n');
    }
    answer + &section
}
