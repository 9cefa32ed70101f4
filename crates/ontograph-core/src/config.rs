//! ontograph Configuration Management
//!
//! Handles configuration from environment variables and config files with
//! defaults suited to a local OpenAI-compatible server. Per-request overrides
//! are carried in [`ExtractionSettings`] rather than process-wide state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Extraction pipeline configuration
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = parse_var("API_PORT", port)?;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(temperature) = std::env::var("LLM_TEMPERATURE") {
            config.llm.temperature = parse_var("LLM_TEMPERATURE", temperature)?;
        }

        // Pipeline
        if let Ok(size) = std::env::var("CHUNK_SIZE") {
            config.pipeline.chunk_size = parse_var("CHUNK_SIZE", size)?;
        }
        if let Ok(overlap) = std::env::var("CHUNK_OVERLAP") {
            config.pipeline.chunk_overlap = parse_var("CHUNK_OVERLAP", overlap)?;
        }
        if let Ok(limit) = std::env::var("MAX_CONCURRENCY") {
            config.pipeline.max_concurrency = parse_var("MAX_CONCURRENCY", limit)?;
        }
        if let Ok(strategy) = std::env::var("EXTRACTION_STRATEGY") {
            config.pipeline.strategy = strategy.parse()?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.server.host != defaults.server.host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != defaults.server.port {
            self.server.port = env_config.server.port;
        }
        if env_config.llm.base_url != defaults.llm.base_url {
            self.llm.base_url = env_config.llm.base_url;
        }
        if env_config.llm.model != defaults.llm.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        // Always use env for sensitive values
        if env_config.llm.api_key.is_some() {
            self.llm.api_key = env_config.llm.api_key;
        }

        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.pipeline.validate()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            // Large documents fan out into many two-stage LLM exchanges
            request_timeout_secs: 900,
            max_body_size: 50 * 1024 * 1024, // 50MB
            cors_enabled: true,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// API key for OpenAI-compatible servers
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (LM Studio, vLLM, OpenAI)
    pub base_url: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: None,
            base_url: "http://localhost:1234/v1".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            LlmProvider::OpenAI if self.base_url.trim().is_empty() => {
                return Err(ConfigError::MissingRequired("llm.base_url".to_string()))
            }
            LlmProvider::Ollama if self.ollama_url.trim().is_empty() => {
                return Err(ConfigError::MissingRequired("llm.ollama_url".to_string()))
            }
            _ => {}
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingRequired("llm.model".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm.temperature".to_string(),
                value: self.temperature.to_string(),
            });
        }
        Ok(())
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "lmstudio" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// How a chunk is turned into a graph in two LLM exchanges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Propose node types, then extract nodes and relationships constrained to them
    #[default]
    OntologyFirst,

    /// Extract nodes, then ask for relationships between them
    NodesFirst,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OntologyFirst => write!(f, "ontology_first"),
            Self::NodesFirst => write!(f, "nodes_first"),
        }
    }
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "ontology_first" | "ontology" => Ok(Self::OntologyFirst),
            "nodes_first" | "nodes" => Ok(Self::NodesFirst),
            _ => Err(ConfigError::InvalidValue {
                key: "EXTRACTION_STRATEGY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum chunk length in tokens
    pub chunk_size: usize,

    /// Tokens shared between neighbouring chunks
    pub chunk_overlap: usize,

    /// Ceiling on chunk extractions in flight across all documents
    pub max_concurrency: usize,

    /// Prompt chaining strategy
    pub strategy: ExtractionStrategy,

    /// Timeout for a single LLM exchange
    pub stage_timeout_secs: u64,

    /// Attempts per stage before the chunk is dropped
    pub stage_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
            max_concurrency: 10,
            strategy: ExtractionStrategy::OntologyFirst,
            stage_timeout_secs: 120,
            stage_attempts: 1,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.chunk_overlap".to_string(),
                value: format!(
                    "{} (must be below chunk_size {})",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.max_concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        if self.stage_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.stage_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Settings for one pipeline invocation
///
/// Built from [`AppConfig`] defaults and overridden by request fields, so
/// concurrent requests never share credentials or model choices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSettings {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
}

impl ExtractionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            llm: config.llm.clone(),
            pipeline: config.pipeline.clone(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.llm.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.llm.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.llm.temperature = temperature;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.pipeline.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.pipeline.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.pipeline.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.pipeline.validate()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pipeline.chunk_size, 4000);
        assert_eq!(config.pipeline.chunk_overlap, 200);
        assert_eq!(config.pipeline.max_concurrency, 10);
        assert_eq!(config.llm.temperature, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!(
            "openai".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAI
        );
        assert_eq!(
            "Ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("invalid".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "nodes-first".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::NodesFirst
        );
        assert_eq!(
            "ontology_first".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::OntologyFirst
        );
        assert!("random".parse::<ExtractionStrategy>().is_err());
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let pipeline = PipelineConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_missing_base_url_rejected() {
        let llm = LlmConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            llm.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_settings_overrides() {
        let settings = ExtractionSettings::from_config(&AppConfig::default())
            .with_model("gemma-3-12b")
            .with_api_key("")
            .with_chunk_size(800)
            .with_chunk_overlap(50)
            .with_strategy(ExtractionStrategy::NodesFirst);

        assert_eq!(settings.llm.model, "gemma-3-12b");
        assert!(settings.llm.api_key.is_none());
        assert_eq!(settings.pipeline.chunk_size, 800);
        assert_eq!(settings.pipeline.strategy, ExtractionStrategy::NodesFirst);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pipeline]\nchunk_size = 1000\nstrategy = \"nodes_first\"\n\n[llm]\nmodel = \"local\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.chunk_size, 1000);
        assert_eq!(config.pipeline.chunk_overlap, 200);
        assert_eq!(config.pipeline.strategy, ExtractionStrategy::NodesFirst);
        assert_eq!(config.llm.model, "local");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/nonexistent/ontograph.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
