//! ontograph Extractor - Chunked LLM extraction pipeline
//!
//! Turns document entries into one merged knowledge graph:
//! documents are chunked, every chunk goes through a two-stage LLM exchange
//! under a global concurrency ceiling, responses are repaired into validated
//! records, and all records are merged once at the end.

pub mod chunker;
pub mod cleanup;
pub mod extractor;
pub mod gate;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod repair;

pub use chunker::{Chunker, TokenSizer};
pub use cleanup::normalize_id;
pub use extractor::{ChunkExtractor, ChunkStage, StagePolicy};
pub use gate::ConcurrencyGate;
pub use merger::merge;
pub use normalizer::normalize;
pub use pipeline::{OntologyPipeline, PipelineStats};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Chunking configuration errors
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Invalid chunk configuration: {0}")]
    InvalidConfig(String),
}

/// An LLM response could not be turned into a record
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Response contains no JSON object")]
    NoJson,

    #[error("Malformed JSON: {0}")]
    Malformed(String),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Response lacks 'nodes' or 'relationships'")]
    MissingKeys,

    #[error("Field '{key}' must be an array, found {found}")]
    InvalidField { key: &'static str, found: &'static str },
}

/// A chunk extraction failed and its contribution is dropped
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{stage} stage failed: {source}")]
    Llm {
        stage: ChunkStage,
        #[source]
        source: ontograph_core::OntographError,
    },

    #[error("{stage} stage timed out after {seconds}s")]
    Timeout { stage: ChunkStage, seconds: u64 },

    #[error("Unusable response: {0}")]
    Parse(#[from] ParseError),
}

/// The gate stopped admitting work before a task got a permit
#[derive(Error, Debug)]
#[error("Concurrency gate is closed")]
pub struct GateClosed;

/// Short name of a JSON value's kind
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
