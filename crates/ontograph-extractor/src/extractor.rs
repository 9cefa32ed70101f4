//! Per-chunk two-stage extraction
//!
//! Each chunk walks `AwaitingTypes -> AwaitingGraph -> Done | Failed`.
//! Stage 1 asks for node types (ontology-first) or nodes (nodes-first);
//! stage 2 embeds the raw stage-1 response and asks for the graph. Every
//! stage has its own timeout and attempt budget.

use ontograph_core::{ExtractionStrategy, LlmClient, PartialRecord, PipelineConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::normalizer::normalize;
use crate::prompts::PromptSet;
use crate::ExtractionError;

/// The LLM exchange a chunk is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStage {
    /// Stage 1: node types or nodes
    AwaitingTypes,
    /// Stage 2: nodes and relationships
    AwaitingGraph,
}

impl std::fmt::Display for ChunkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingTypes => write!(f, "types"),
            Self::AwaitingGraph => write!(f, "graph"),
        }
    }
}

enum ChunkState {
    AwaitingTypes,
    AwaitingGraph { first_response: String },
    Done(PartialRecord),
    Failed(ExtractionError),
}

/// Timeout and attempt budget applied to each stage
#[derive(Debug, Clone, Copy)]
pub struct StagePolicy {
    pub timeout: Duration,
    pub attempts: u32,
}

impl Default for StagePolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl StagePolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.stage_timeout_secs),
            attempts: config.stage_attempts.max(1),
        }
    }
}

/// Runs the two-stage exchange for one chunk
pub struct ChunkExtractor {
    llm: Arc<dyn LlmClient>,
    strategy: ExtractionStrategy,
    prompts: PromptSet,
    policy: StagePolicy,
}

impl ChunkExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, strategy: ExtractionStrategy) -> Self {
        Self {
            llm,
            strategy,
            prompts: PromptSet::default(),
            policy: StagePolicy::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    /// Extract a record, or `None` if any stage fails
    pub async fn extract(&self, chunk: &str, document: &str) -> Option<PartialRecord> {
        match self.try_extract(chunk, document).await {
            Ok(record) => Some(record),
            Err(e) => {
                error!(%document, error = %e, "Dropping chunk");
                None
            }
        }
    }

    /// Extract a record, reporting why a chunk failed
    pub async fn try_extract(
        &self,
        chunk: &str,
        document: &str,
    ) -> Result<PartialRecord, ExtractionError> {
        let mut state = ChunkState::AwaitingTypes;

        loop {
            state = match state {
                ChunkState::AwaitingTypes => {
                    let system = self.prompts.first_stage(self.strategy);
                    match self
                        .with_attempts(ChunkStage::AwaitingTypes, || {
                            self.call(ChunkStage::AwaitingTypes, system, chunk)
                        })
                        .await
                    {
                        Ok(first_response) => ChunkState::AwaitingGraph { first_response },
                        Err(e) => ChunkState::Failed(e),
                    }
                }
                ChunkState::AwaitingGraph { first_response } => {
                    let system = self.prompts.second_stage(self.strategy, &first_response);
                    let system = system.as_str();
                    match self
                        .with_attempts(ChunkStage::AwaitingGraph, || async move {
                            let raw = self.call(ChunkStage::AwaitingGraph, system, chunk).await?;
                            Ok(normalize(&raw, document)?)
                        })
                        .await
                    {
                        Ok(record) => ChunkState::Done(record),
                        Err(e) => ChunkState::Failed(e),
                    }
                }
                ChunkState::Done(record) => return Ok(record),
                ChunkState::Failed(e) => return Err(e),
            };
        }
    }

    async fn with_attempts<T, F, Fut>(
        &self,
        stage: ChunkStage,
        mut op: F,
    ) -> Result<T, ExtractionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractionError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.policy.attempts => {
                    warn!(%stage, attempt, error = %e, "Retrying stage");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call(
        &self,
        stage: ChunkStage,
        system: &str,
        user: &str,
    ) -> Result<String, ExtractionError> {
        debug!(%stage, model = self.llm.model(), chunk_chars = user.len(), "LLM exchange");

        match timeout(self.policy.timeout, self.llm.complete(system, user)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(source)) => Err(ExtractionError::Llm { stage, source }),
            Err(_) => Err(ExtractionError::Timeout {
                stage,
                seconds: self.policy.timeout.as_secs(),
            }),
        }
    }
}
