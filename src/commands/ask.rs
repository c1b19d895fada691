//! Ask command implementation

use crate::error::Result;
use crate::pipeline::{AppContext, ChatRequest, ChatResponse};
use crate::respond::court_display_name;

/// Run one message through the full pipeline
pub async fn cmd_ask(ctx: &AppContext, message: &str, inline_sources: bool) -> Result<ChatResponse> {
    let request = ChatRequest {
        message: message.to_string(),
    };
    ctx.answer_with(&request, inline_sources).await
}

pub fn print_chat_response(response: &ChatResponse) {
    println!("\n{}\n", response.message);

    if !response.sources.is_empty() {
        println!("Sources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  {}. {} ({}, {})",
                i + 1,
                source.case_name,
                court_display_name(&source.court),
                if source.date.is_empty() {
                    "undated"
                } else {
                    source.date.as_str()
                }
            );
            if source.citation != source.case_name {
                println!("     {}", source.citation);
            }
            if source.url != "#" {
                println!("     {}", source.url);
            }
        }
        println!();
    }

    println!(
        "Relevant: {}  Confidence: {}",
        if response.relevant { "yes" } else { "no" },
        response.confidence
    );
}
