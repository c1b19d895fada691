//! Two-stage query relevance classification
//!
//! Keyword density settles clear cases locally. Only ambiguous queries are
//! sent to the language model, and any failure there falls back to the
//! keyword score so classification always produces a result.

mod keywords;

pub use keywords::*;

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::llm::{strip_code_fence, LanguageModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CLASSIFIER_PROMPT: &str = r#"You are a legal query classifier for a Delaware corporate law assistant.

Decide whether the user's query is relevant to Delaware corporate law and case law.

RELEVANT queries include:
- Delaware corporate law concepts (fiduciary duty, business judgment rule, etc.)
- Specific Delaware court cases or precedents
- Corporate governance, mergers, acquisitions, shareholder rights
- The Delaware Court of Chancery or Delaware Supreme Court
- Legal standards, procedures, or remedies in Delaware corporate law

IRRELEVANT queries include:
- Personal questions
- General knowledge unrelated to law
- Other legal domains (criminal law, family law, etc.)
- Other states' corporate law, unless compared to Delaware
- Casual conversation or greetings

Respond with only a JSON object:
{"relevant": true|false, "confidence": <number 0-1>, "reason": "<short explanation>", "suggested_topics": ["<topic>", ...]}"#;

const REJECTION_MESSAGE: &str = "I apologize, but your question does not appear to be related to Delaware corporate law or case law. I am specifically designed to answer questions about:\n\n\
• Delaware corporate law concepts (fiduciary duty, business judgment rule, etc.)\n\
• Delaware Court of Chancery and Supreme Court cases\n\
• Corporate governance, mergers, and acquisitions\n\
• Shareholder rights and remedies\n\
• Delaware legal standards and procedures\n\n\
Please ask a question related to these topics, and I'll be happy to help!";

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    FastAccept,
    FastReject,
    Escalated,
    Fallback,
}

impl std::fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassificationMethod::FastAccept => "fast-accept",
            ClassificationMethod::FastReject => "fast-reject",
            ClassificationMethod::Escalated => "escalated",
            ClassificationMethod::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Outcome of the local keyword stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeywordDecision {
    FastAccept { score: f32 },
    FastReject { score: f32 },
    Escalate { score: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub relevant: bool,
    pub confidence: f32,
    pub reason: String,
    pub suggested_topics: Vec<String>,
    pub method: ClassificationMethod,
    pub keyword_score: f32,
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    relevant: bool,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    suggested_topics: Vec<String>,
}

pub struct QueryClassifier {
    llm: Arc<dyn LanguageModel>,
    vocabulary: Vocabulary,
    thresholds: ClassifierConfig,
}

impl QueryClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>, thresholds: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            llm,
            vocabulary: Vocabulary::legal()?,
            thresholds: thresholds.clone(),
        })
    }

    /// Matched vocabulary terms per whitespace word, doubled and capped at 1.0
    pub fn keyword_score(&self, query: &str) -> f32 {
        let words = query.split_whitespace().count();
        if words == 0 {
            return 0.0;
        }
        let matches = self.vocabulary.count_matches(query);
        (matches as f32 / words as f32 * 2.0).min(1.0)
    }

    pub fn decide(&self, query: &str) -> KeywordDecision {
        let score = self.keyword_score(query);
        if score > self.thresholds.accept_threshold {
            KeywordDecision::FastAccept { score }
        } else if score < self.thresholds.reject_threshold {
            KeywordDecision::FastReject { score }
        } else {
            KeywordDecision::Escalate { score }
        }
    }

    pub fn extract_topics(&self, query: &str) -> Vec<String> {
        self.vocabulary.topics(query)
    }

    /// Classify a query; never fails
    pub async fn classify(&self, query: &str) -> ClassificationResult {
        let result = match self.decide(query) {
            KeywordDecision::FastAccept { score } => ClassificationResult {
                relevant: true,
                confidence: score.min(0.95),
                reason: "Query contains multiple legal keywords".to_string(),
                suggested_topics: self.extract_topics(query),
                method: ClassificationMethod::FastAccept,
                keyword_score: score,
            },
            KeywordDecision::FastReject { score } => ClassificationResult {
                relevant: false,
                confidence: 0.9,
                reason: "Query does not contain legal terminology".to_string(),
                suggested_topics: Vec::new(),
                method: ClassificationMethod::FastReject,
                keyword_score: score,
            },
            KeywordDecision::Escalate { score } => match self.ask_model(query, score).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Model classification failed, using keyword fallback");
                    self.fallback(query, score)
                }
            },
        };

        info!(
            method = %result.method,
            relevant = result.relevant,
            confidence = result.confidence,
            keyword_score = result.keyword_score,
            "Classified query"
        );
        result
    }

    async fn ask_model(&self, query: &str, score: f32) -> Result<ClassificationResult> {
        debug!(score, "Escalating query to language model");
        let reply = self.llm.complete(CLASSIFIER_PROMPT, query).await?;
        let verdict: ModelVerdict = serde_json::from_str(strip_code_fence(&reply))
            .map_err(|e| Error::Classification(format!("unparseable model reply: {}", e)))?;

        let confidence = verdict
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(score)
            .clamp(0.0, 1.0);

        Ok(ClassificationResult {
            relevant: verdict.relevant,
            confidence,
            reason: verdict.reason,
            suggested_topics: verdict.suggested_topics,
            method: ClassificationMethod::Escalated,
            keyword_score: score,
        })
    }

    fn fallback(&self, query: &str, score: f32) -> ClassificationResult {
        let relevant = score > self.thresholds.fallback_threshold;
        ClassificationResult {
            relevant,
            confidence: score,
            reason: "Fallback to keyword-based classification".to_string(),
            suggested_topics: if relevant {
                self.extract_topics(query)
            } else {
                Vec::new()
            },
            method: ClassificationMethod::Fallback,
            keyword_score: score,
        }
    }

    /// Fixed reply for queries outside the assistant's domain
    pub fn rejection_message(&self) -> &'static str {
        REJECTION_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn classifier(llm: Arc<ScriptedLlm>) -> QueryClassifier {
        QueryClassifier::new(llm, &ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_keyword_score() {
        let c = classifier(Arc::new(ScriptedLlm::new()));
        assert_eq!(c.keyword_score(""), 0.0);
        assert_eq!(c.keyword_score("   "), 0.0);
        assert_eq!(c.keyword_score("What is fiduciary duty?"), 1.0);
        // one match in five words
        assert!((c.keyword_score("tell me about mergers generally") - 0.4).abs() < 1e-6);
        assert!((c.keyword_score("explain the Revlon doctrine") - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_fast_accept_skips_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let c = classifier(llm.clone());

        let result = c.classify("What is fiduciary duty?").await;
        assert!(result.relevant);
        assert_eq!(result.method, ClassificationMethod::FastAccept);
        assert!((result.confidence - 0.95).abs() < 1e-6);
        assert_eq!(result.suggested_topics, vec!["fiduciary duty"]);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_fast_reject_skips_model() {
        let llm = Arc::new(ScriptedLlm::new());
        let c = classifier(llm.clone());

        let result = c.classify("What's the weather today?").await;
        assert!(!result.relevant);
        assert_eq!(result.method, ClassificationMethod::FastReject);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_plural_legal_terms_are_not_rejected() {
        let llm = Arc::new(ScriptedLlm::new().reply(
            r#"{"relevant": true, "confidence": 0.9, "reason": "M&A duties", "suggested_topics": ["merger"]}"#,
        ));
        let c = classifier(llm.clone());

        let result = c.classify("Can shareholders sue directors over buyouts?").await;
        assert_eq!(result.method, ClassificationMethod::FastAccept);
        assert!(result.relevant);
        assert_eq!(llm.calls(), 0);

        // 3 matches / 9 words * 2 sits between the thresholds
        let result = c
            .classify("What duties do directors owe in mergers and acquisitions?")
            .await;
        assert_eq!(result.method, ClassificationMethod::Escalated);
        assert!(result.relevant);
        assert_eq!(llm.calls(), 1);
    }

    #[test]
    fn test_scores_on_a_threshold_escalate() {
        let c = classifier(Arc::new(ScriptedLlm::new()));
        // 1 match / 4 words * 2
        let query = "explain the Revlon doctrine";
        assert_eq!(c.keyword_score(query), 0.5);

        let at_accept = ClassifierConfig {
            accept_threshold: 0.5,
            reject_threshold: 0.25,
            ..ClassifierConfig::default()
        };
        let c = QueryClassifier::new(Arc::new(ScriptedLlm::new()), &at_accept).unwrap();
        assert_eq!(c.decide(query), KeywordDecision::Escalate { score: 0.5 });

        let at_reject = ClassifierConfig {
            accept_threshold: 0.75,
            reject_threshold: 0.5,
            ..ClassifierConfig::default()
        };
        let c = QueryClassifier::new(Arc::new(ScriptedLlm::new()), &at_reject).unwrap();
        assert_eq!(c.decide(query), KeywordDecision::Escalate { score: 0.5 });

        let above = ClassifierConfig {
            accept_threshold: 0.45,
            reject_threshold: 0.25,
            ..ClassifierConfig::default()
        };
        let c = QueryClassifier::new(Arc::new(ScriptedLlm::new()), &above).unwrap();
        assert_eq!(c.decide(query), KeywordDecision::FastAccept { score: 0.5 });
    }

    #[tokio::test]
    async fn test_escalation_parses_fenced_json() {
        let llm = Arc::new(ScriptedLlm::new().reply(
            "```json\n{\"relevant\": true, \"confidence\": 1.7, \"reason\": \"Revlon duties\", \"suggested_topics\": [\"revlon\"]}\n```",
        ));
        let c = classifier(llm.clone());

        let result = c.classify("explain the Revlon doctrine").await;
        assert_eq!(result.method, ClassificationMethod::Escalated);
        assert!(result.relevant);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.suggested_topics, vec!["revlon"]);
        assert_eq!(llm.calls(), 1);
        assert_eq!(llm.user_prompts(), vec!["explain the Revlon doctrine"]);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let llm = Arc::new(ScriptedLlm::new().fail("timeout"));
        let c = classifier(llm.clone());

        // score 0.5 > fallback threshold 0.3
        let result = c.classify("explain the Revlon doctrine").await;
        assert_eq!(result.method, ClassificationMethod::Fallback);
        assert!(result.relevant);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.reason, "Fallback to keyword-based classification");
        assert_eq!(result.suggested_topics, vec!["revlon"]);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let llm = Arc::new(ScriptedLlm::new().reply("I think it is relevant."));
        let c = classifier(llm.clone());

        // 2 matches / 10 words * 2 = 0.4
        let query = "my neighbour asked me whether a board should care today";
        let result = c.classify(query).await;
        assert_eq!(result.method, ClassificationMethod::Fallback);
        assert!((result.keyword_score - 0.4).abs() < 1e-6);
        assert!(result.relevant);
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(
            serde_json::to_string(&ClassificationMethod::FastAccept).unwrap(),
            "\"fast-accept\""
        );
        assert_eq!(ClassificationMethod::Fallback.to_string(), "fallback");
    }
}
