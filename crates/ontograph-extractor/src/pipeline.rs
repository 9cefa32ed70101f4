//! End-to-end orchestration
//!
//! Entries are chunked, every chunk of every document is dispatched as one
//! flat batch of futures under the shared gate, and the surviving records are
//! merged once after the whole batch has settled.

use futures::future::join_all;
use ontograph_core::{DocumentEntry, LlmClient, MergedGraph, PartialRecord, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::chunker::Chunker;
use crate::extractor::{ChunkExtractor, StagePolicy};
use crate::gate::ConcurrencyGate;
use crate::merger::merge;
use crate::prompts::PromptSet;
use crate::ChunkError;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Entries that produced at least one chunk
    pub documents: usize,
    /// Entries skipped as blank
    pub skipped_documents: usize,
    pub chunks: usize,
    /// Chunks whose extraction produced a record
    pub succeeded: usize,
    pub failed: usize,
    pub nodes: usize,
    pub relationships: usize,
    pub elapsed_ms: u64,
}

/// Chunk, extract and merge a set of document entries
pub struct OntologyPipeline {
    chunker: Chunker,
    extractor: ChunkExtractor,
    gate: ConcurrencyGate,
}

impl OntologyPipeline {
    /// Build a pipeline from configuration, with its own gate
    pub fn new(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> Result<Self, ChunkError> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let extractor = ChunkExtractor::new(llm, config.strategy)
            .with_policy(StagePolicy::from_config(config));

        Ok(Self {
            chunker,
            extractor,
            gate: ConcurrencyGate::new(config.max_concurrency),
        })
    }

    /// Share a gate with other pipelines
    pub fn with_gate(mut self, gate: ConcurrencyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.extractor = self.extractor.with_prompts(prompts);
        self
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run the pipeline; `None` when nothing could be extracted
    pub async fn run(&self, entries: &[DocumentEntry]) -> Option<MergedGraph> {
        self.run_with_stats(entries).await.0
    }

    /// Run the pipeline and report what happened to every chunk
    pub async fn run_with_stats(
        &self,
        entries: &[DocumentEntry],
    ) -> (Option<MergedGraph>, PipelineStats) {
        let started = Instant::now();
        let mut stats = PipelineStats::default();

        if entries.is_empty() {
            warn!("No documents to process");
            return (None, stats);
        }

        let mut tasks: Vec<(String, &str)> = Vec::new();
        for entry in entries {
            if entry.is_blank() {
                warn!(document = %entry.name, "Skipping empty document");
                stats.skipped_documents += 1;
                continue;
            }

            let chunks = self.chunker.split(&entry.to_text());
            if chunks.is_empty() {
                warn!(document = %entry.name, "Skipping empty document");
                stats.skipped_documents += 1;
                continue;
            }

            stats.documents += 1;
            tasks.extend(chunks.into_iter().map(|chunk| (chunk, entry.name.as_str())));
        }
        stats.chunks = tasks.len();

        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            max_in_flight = self.gate.limit(),
            strategy = %self.extractor.strategy(),
            "Extracting chunks"
        );

        let results = join_all(
            tasks
                .iter()
                .map(|(chunk, document)| self.extract_gated(chunk, document)),
        )
        .await;

        let records: Vec<_> = results.into_iter().flatten().collect();
        stats.succeeded = records.len();
        stats.failed = stats.chunks - stats.succeeded;

        let graph = if records.is_empty() {
            warn!(chunks = stats.chunks, "No chunk produced a usable record");
            None
        } else {
            let graph = merge(&records);
            stats.nodes = graph.node_count();
            stats.relationships = graph.relationship_count();
            if graph.is_empty() {
                warn!("Merged graph has no nodes");
                None
            } else {
                Some(graph)
            }
        };

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            nodes = stats.nodes,
            relationships = stats.relationships,
            elapsed_ms = stats.elapsed_ms,
            "Pipeline finished"
        );

        (graph, stats)
    }

    async fn extract_gated(&self, chunk: &str, document: &str) -> Option<PartialRecord> {
        match self.gate.run(self.extractor.extract(chunk, document)).await {
            Ok(record) => record,
            Err(e) => {
                error!(%document, error = %e, "Dropping chunk");
                None
            }
        }
    }
}
