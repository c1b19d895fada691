//! Classify command implementation

use crate::classify::ClassificationResult;
use crate::pipeline::AppContext;

pub async fn cmd_classify(ctx: &AppContext, query: &str) -> ClassificationResult {
    ctx.classify(query).await
}

pub fn print_classification(query: &str, result: &ClassificationResult) {
    println!("\nQuery: {}", query);
    println!("  Relevant: {}", result.relevant);
    println!("  Confidence: {:.2}", result.confidence);
    println!("  Keyword score: {:.2}", result.keyword_score);
    println!("  Reason: {}", result.reason);
    println!("  Method: {}", result.method);
    if !result.suggested_topics.is_empty() {
        println!("  Topics: {}", result.suggested_topics.join(", "));
    }
}
