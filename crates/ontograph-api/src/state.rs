//! Application state management

use ontograph_core::config::{AppConfig, LlmConfig};
use ontograph_core::LlmClient;
use ontograph_extractor::ConcurrencyGate;
use ontograph_llm::create_llm_client;
use ontograph_parser::ParserRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Builds the LLM client for one request's settings
pub type LlmFactory =
    Arc<dyn Fn(&LlmConfig) -> ontograph_core::Result<Arc<dyn LlmClient>> + Send + Sync>;

fn default_llm(config: &LlmConfig) -> ontograph_core::Result<Arc<dyn LlmClient>> {
    create_llm_client(config).map(Arc::from)
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Document readers for uploads
    pub parsers: ParserRegistry,
    /// In-flight extraction ceiling shared by all requests
    pub gate: ConcurrencyGate,
    /// LLM client constructor
    pub llm_factory: LlmFactory,
}

impl AppState {
    /// Create new application state with config
    pub fn new(config: AppConfig) -> Self {
        let gate = ConcurrencyGate::new(config.pipeline.max_concurrency);
        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            parsers: ParserRegistry::with_defaults(),
            gate,
            llm_factory: Arc::new(default_llm),
        }
    }

    /// Replace how LLM clients are built
    pub fn with_llm_factory(mut self, factory: LlmFactory) -> Self {
        self.llm_factory = factory;
        self
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
