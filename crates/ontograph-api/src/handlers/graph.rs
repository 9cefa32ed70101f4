//! Graph generation handler
//!
//! Accepts the multipart form the web frontend posts: LLM settings, chunking
//! overrides, optional pasted text and any number of uploaded files.

use crate::error::AppError;
use crate::service::{generate, GenerateRequest};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use ontograph_core::{DocumentEntry, ExtractionSettings, ExtractionStrategy, MergedGraph};
use ontograph_extractor::PipelineStats;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Successful generation
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Self-contained interactive page
    pub html: String,
    pub graph: MergedGraph,
    pub stats: PipelineStats,
    /// Uploads that could not be read
    pub skipped_files: Vec<String>,
}

/// Form fields after parsing; blank fields are left unset
#[derive(Debug, Default)]
struct GraphForm {
    api_key: Option<String>,
    base_url: Option<String>,
    model_name: Option<String>,
    temperature: Option<f32>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    strategy: Option<ExtractionStrategy>,
    entries: Vec<DocumentEntry>,
    skipped_files: Vec<String>,
    received_input: bool,
}

impl GraphForm {
    async fn read(multipart: &mut Multipart, state: &AppState) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "files" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.received_input = true;

                match state.parsers.parse_bytes(&file_name, &bytes) {
                    Ok(entry) => {
                        info!(document = %entry.name, bytes = bytes.len(), "Loaded upload");
                        form.entries.push(entry);
                    }
                    Err(e) => {
                        warn!(file = %file_name, error = %e, "Skipping unreadable upload");
                        form.skipped_files.push(file_name);
                    }
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "api_key" => form.api_key = non_blank(&value),
                "base_url" => form.base_url = non_blank(&value),
                "model_name" => form.model_name = non_blank(&value),
                "temperature" => form.temperature = parse_field("temperature", &value)?,
                "chunk_size" => form.chunk_size = parse_field("chunk_size", &value)?,
                "chunk_overlap" => form.chunk_overlap = parse_field("chunk_overlap", &value)?,
                "strategy" => form.strategy = parse_field("strategy", &value)?,
                "text" => {
                    if !value.trim().is_empty() {
                        form.received_input = true;
                        form.entries.push(DocumentEntry::raw_text(value));
                    }
                }
                other => warn!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Server defaults overridden by whatever the form supplied
    fn settings(&self, base: ExtractionSettings) -> ExtractionSettings {
        let mut settings = base;
        if let Some(key) = &self.api_key {
            settings = settings.with_api_key(key.as_str());
        }
        if let Some(url) = &self.base_url {
            settings = settings.with_base_url(url.as_str());
        }
        if let Some(model) = &self.model_name {
            settings = settings.with_model(model.as_str());
        }
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(chunk_size) = self.chunk_size {
            settings = settings.with_chunk_size(chunk_size);
        }
        if let Some(overlap) = self.chunk_overlap {
            settings = settings.with_chunk_overlap(overlap);
        }
        if let Some(strategy) = self.strategy {
            settings = settings.with_strategy(strategy);
        }
        settings
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_field<T>(key: &str, value: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match non_blank(value) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("Invalid {key} '{value}': {e}"))),
    }
}

/// Build a knowledge graph from uploaded documents and pasted text
pub async fn generate_graph(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    state.increment_requests();

    let form = GraphForm::read(&mut multipart, &state).await?;
    if !form.received_input {
        return Err(AppError::BadRequest(
            "Provide text or at least one file".to_string(),
        ));
    }
    if form.entries.is_empty() {
        return Err(AppError::BadRequest(format!(
            "None of the uploaded files could be read: {}",
            form.skipped_files.join(", ")
        )));
    }

    let settings = form.settings(ExtractionSettings::from_config(&state.config));
    info!(
        documents = form.entries.len(),
        model = %settings.llm.model,
        chunk_size = settings.pipeline.chunk_size,
        strategy = %settings.pipeline.strategy,
        "Generating graph"
    );

    let request = GenerateRequest {
        entries: form.entries,
        settings,
    };
    let (output, stats) = generate(request, &state.llm_factory, &state.gate).await?;

    match output {
        Some(output) => Ok(Json(GenerateResponse {
            html: output.html,
            graph: output.graph,
            stats,
            skipped_files: form.skipped_files,
        })),
        None => Err(AppError::EmptyGraph(format!(
            "{} of {} chunks failed",
            stats.failed, stats.chunks
        ))),
    }
}
