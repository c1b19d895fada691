//! End-to-end query handling over a loaded index

use crate::classify::{ClassificationResult, QueryClassifier};
use crate::config::Config;
use crate::embed::{Embedder, HttpEmbedder};
use crate::error::{Error, Result};
use crate::gate::{ConfidenceGate, GateDecision, ESCALATION_MESSAGE};
use crate::llm::{HttpLanguageModel, LanguageModel};
use crate::respond::{format_sources, Confidence, ResponseSynthesizer, SourceRef};
use crate::store::{IndexManifest, RetrievalFilter, SearchResult, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub relevant: bool,
    pub sources: Vec<SourceRef>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub index_loaded: bool,
    pub vectors: usize,
}

/// Everything a query needs, built once and shared by reference
pub struct AppContext {
    config: Config,
    index: VectorIndex,
    classifier: QueryClassifier,
    gate: ConfidenceGate,
    synthesizer: ResponseSynthesizer,
}

impl AppContext {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let index = VectorIndex::from_config(&config, embedder);
        let classifier = QueryClassifier::new(llm.clone(), &config.classifier)?;
        let gate = ConfidenceGate::new(config.retrieval.similarity_threshold);
        let synthesizer = ResponseSynthesizer::new(llm, config.retrieval.max_sources);
        Ok(Self {
            config,
            index,
            classifier,
            gate,
            synthesizer,
        })
    }

    /// Build HTTP clients from config without loading the index
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&config.embedding)?);
        let llm: Arc<dyn LanguageModel> = Arc::new(HttpLanguageModel::new(&config.llm)?);
        Self::new(config, embedder, llm)
    }

    /// Build HTTP clients and load the persisted index
    pub fn load(config: Config) -> Result<Self> {
        let mut ctx = Self::from_config(config)?;
        ctx.load_index()?;
        Ok(ctx)
    }

    pub fn load_index(&mut self) -> Result<&IndexManifest> {
        self.index.load()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut VectorIndex {
        &mut self.index
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    pub async fn classify(&self, query: &str) -> ClassificationResult {
        self.classifier.classify(query).await
    }

    /// Retrieval with the configured over-fetch size
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&RetrievalFilter>,
    ) -> Result<Vec<SearchResult>> {
        let retrieve_k = self.config.retrieval.retrieve_k.max(k);
        self.index.search(query, k, filter, retrieve_k).await
    }

    /// Classify, retrieve, gate and answer a single message
    pub async fn answer(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.answer_with(request, false).await
    }

    /// Like [`answer`](Self::answer), optionally appending a sources section
    /// to the message text
    pub async fn answer_with(
        &self,
        request: &ChatRequest,
        inline_sources: bool,
    ) -> Result<ChatResponse> {
        let query = request.message.trim();
        if query.is_empty() {
            return Err(Error::DataValidation("Empty message".to_string()));
        }
        info!(query = %preview(query, 100), "Received query");

        let classification = self.classifier.classify(query).await;
        if !classification.relevant {
            return Ok(ChatResponse {
                message: self.classifier.rejection_message().to_string(),
                relevant: false,
                sources: Vec::new(),
                confidence: Confidence::High,
            });
        }

        let results = self
            .search(query, self.config.retrieval.default_k, None)
            .await?;

        if let GateDecision::Escalate(reason) = self.gate.evaluate(&results) {
            warn!(?reason, "Escalating relevant query");
            return Ok(ChatResponse {
                message: ESCALATION_MESSAGE.to_string(),
                relevant: true,
                sources: Vec::new(),
                confidence: Confidence::Low,
            });
        }

        let response = self
            .synthesizer
            .synthesize(query, &results, inline_sources)
            .await;

        let sources = if response.confidence == Confidence::Error {
            Vec::new()
        } else {
            format_sources(&results, self.config.retrieval.max_sources)
        };

        Ok(ChatResponse {
            message: response.answer,
            relevant: true,
            sources,
            confidence: response.confidence,
        })
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            status: "healthy".to_string(),
            index_loaded: self.index.is_loaded(),
            vectors: self.index.len(),
        }
    }
}

/// Collapse whitespace and cut to `max_chars`, marking the cut with an ellipsis
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
