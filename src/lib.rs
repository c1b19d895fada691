//! docket - grounded question answering over court opinions
//!
//! This crate provides:
//! - Recursive chunking of case law documents and an exact, persisted vector index
//! - A two-stage (keyword, then language model) relevance classifier
//! - A similarity gate and a response synthesizer that cites its sources
//! - CLI commands for building the index and asking questions

pub mod chunk;
pub mod classify;
pub mod commands;
pub mod config;
pub mod document;
pub mod embed;
pub mod embedding_backend;
pub mod error;
pub mod gate;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod respond;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
