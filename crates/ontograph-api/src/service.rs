//! Graph generation shared by the HTTP handlers

use ontograph_core::{ConfigError, DocumentEntry, ExtractionSettings, MergedGraph, OntographError};
use ontograph_extractor::{ChunkError, ConcurrencyGate, OntologyPipeline, PipelineStats};
use ontograph_render::{GraphRenderer, RenderError};
use serde::Serialize;
use thiserror::Error;

use crate::state::LlmFactory;

/// One generation request: documents plus the settings to process them with
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub entries: Vec<DocumentEntry>,
    pub settings: ExtractionSettings,
}

/// A merged graph and its rendered page
#[derive(Debug, Clone, Serialize)]
pub struct GraphOutput {
    pub graph: MergedGraph,
    pub html: String,
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Llm(#[from] OntographError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Validate settings, run the pipeline under `gate` and render the result
///
/// Returns `None` output when no node could be extracted.
pub async fn generate(
    request: GenerateRequest,
    llm_factory: &LlmFactory,
    gate: &ConcurrencyGate,
) -> Result<(Option<GraphOutput>, PipelineStats), GenerateError> {
    let GenerateRequest { entries, settings } = request;
    settings.validate()?;

    let llm = llm_factory(&settings.llm)?;
    let pipeline = OntologyPipeline::new(llm, &settings.pipeline)?.with_gate(gate.clone());

    let (graph, stats) = pipeline.run_with_stats(&entries).await;
    let Some(graph) = graph else {
        return Ok((None, stats));
    };

    let output = GraphRenderer::new()
        .render(&graph)?
        .map(|html| GraphOutput { graph, html });
    Ok((output, stats))
}
