//! ontograph Core - Domain models, traits, and shared types
//!
//! This crate defines the abstractions shared by every stage of the
//! knowledge-graph pipeline:
//! - Document entries and tabular content
//! - Partial extraction records produced per chunk
//! - The merged graph and its provenance tag
//! - Common error types
//! - The LLM completion trait
//! - Configuration management

pub mod config;
pub mod document;
pub mod graph;

pub use config::{
    AppConfig, ConfigError, ExtractionSettings, ExtractionStrategy, LlmConfig, LlmProvider,
    LoggingConfig, PipelineConfig, ServerConfig,
};
pub use document::{DocumentContent, DocumentEntry, Table, RAW_TEXT_NAME};
pub use graph::{
    MergedGraph, Node, NodeProperties, NodeRecord, PartialRecord, Provenance, Relationship,
    RelationshipRecord,
};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ontograph operations
#[derive(Error, Debug)]
pub enum OntographError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for OntographError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OntographError>;

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients
///
/// Every extraction stage is a single system/user exchange, so the
/// capability is reduced to one call returning the raw completion text.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a system prompt and user text, returning the raw completion
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

#[async_trait::async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        (**self).complete(system, user).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

// ============================================================================
// Tests
// ============================================================================
