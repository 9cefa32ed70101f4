//! ontograph CLI - Command-line interface
//!
//! Usage:
//!   ontograph generate <paths>... [--text <text>] [--output graph.html]
//!   ontograph chunks <path> [--chunk-size 4000] [--chunk-overlap 200]

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ontograph_core::{
    AppConfig, DocumentEntry, ExtractionSettings, ExtractionStrategy, LlmClient, LlmProvider,
    LoggingConfig,
};
use ontograph_extractor::{Chunker, OntologyPipeline};
use ontograph_llm::create_llm_client;
use ontograph_parser::ParserRegistry;
use ontograph_render::GraphRenderer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "ontograph")]
#[command(about = "Build interactive knowledge graphs from documents with an LLM")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a knowledge graph and write it as HTML
    Generate(GenerateArgs),
    /// Show how a document would be chunked
    Chunks {
        /// Document to split
        path: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Documents to read (.txt, .md, .csv, .pdf, .docx)
    paths: Vec<PathBuf>,

    /// Text to process in addition to the documents
    #[arg(long)]
    text: Option<String>,

    /// HTML output path
    #[arg(short, long, default_value = "graph.html")]
    output: PathBuf,

    /// Also write the merged graph as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// LLM provider (openai, lmstudio, ollama)
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible server
    #[arg(long)]
    base_url: Option<String>,

    /// API key for the LLM server
    #[arg(long)]
    api_key: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Prompt chaining strategy (ontology-first, nodes-first)
    #[arg(long)]
    strategy: Option<ExtractionStrategy>,

    #[command(flatten)]
    chunking: ChunkArgs,
}

#[derive(Args)]
struct ChunkArgs {
    /// Maximum chunk length in tokens
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Tokens shared by neighbouring chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

impl GenerateArgs {
    fn settings(&self, config: &AppConfig) -> ExtractionSettings {
        let mut settings = self.chunking.apply(ExtractionSettings::from_config(config));
        if let Some(provider) = self.provider {
            settings.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            settings = settings.with_model(model.as_str());
        }
        if let Some(url) = &self.base_url {
            settings = settings.with_base_url(url.as_str());
        }
        if let Some(key) = &self.api_key {
            settings = settings.with_api_key(key.as_str());
        }
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(strategy) = self.strategy {
            settings = settings.with_strategy(strategy);
        }
        settings
    }
}

impl ChunkArgs {
    fn apply(&self, mut settings: ExtractionSettings) -> ExtractionSettings {
        if let Some(size) = self.chunk_size {
            settings = settings.with_chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            settings = settings.with_chunk_overlap(overlap);
        }
        settings
    }
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match cli.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ontograph={level}")));

    if cli.log_json || logging.json_format {
        fmt().json().with_env_filter(env_filter).init();
    } else {
        fmt().with_env_filter(env_filter).with_target(false).init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Wall-clock time per stage
#[derive(Default)]
struct Timings {
    stages: Vec<(&'static str, Duration)>,
}

impl Timings {
    fn record(&mut self, stage: &'static str, started: Instant) {
        self.stages.push((stage, started.elapsed()));
    }

    fn print(&self) {
        println!("\nTiming summary:");
        for (stage, elapsed) in &self.stages {
            println!("  {stage:<12} {:>8.2}s", elapsed.as_secs_f64());
        }
        let total: Duration = self.stages.iter().map(|(_, d)| *d).sum();
        println!("  {:<12} {:>8.2}s", "total", total.as_secs_f64());
    }
}

async fn generate(args: GenerateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let settings = args.settings(config);
    settings.validate()?;

    let mut timings = Timings::default();

    let started = Instant::now();
    let mut entries: Vec<DocumentEntry> = ParserRegistry::with_defaults().load_all(&args.paths);
    if let Some(text) = args.text.as_deref().filter(|t| !t.trim().is_empty()) {
        entries.push(DocumentEntry::raw_text(text));
    }
    timings.record("reading", started);

    if entries.is_empty() {
        bail!("No readable input: pass document paths or --text");
    }
    println!("Loaded {} document(s)", entries.len());

    let started = Instant::now();
    let llm: Arc<dyn LlmClient> = Arc::from(create_llm_client(&settings.llm)?);
    let pipeline = OntologyPipeline::new(llm, &settings.pipeline)?;
    let (graph, stats) = pipeline.run_with_stats(&entries).await;
    timings.record("extraction", started);

    println!(
        "Chunks: {} ({} succeeded, {} failed)",
        stats.chunks, stats.succeeded, stats.failed
    );

    let Some(graph) = graph else {
        timings.print();
        bail!("No knowledge graph could be extracted");
    };

    let started = Instant::now();
    let html = GraphRenderer::new()
        .render(&graph)?
        .context("Merged graph has nothing to draw")?;
    std::fs::write(&args.output, html)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    if let Some(path) = &args.json {
        std::fs::write(path, serde_json::to_string_pretty(&graph)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    timings.record("rendering", started);

    println!(
        "Graph: {} nodes, {} relationships -> {}",
        graph.node_count(),
        graph.relationship_count(),
        args.output.display()
    );
    timings.print();

    Ok(())
}

fn chunks(path: &Path, chunking: &ChunkArgs, config: &AppConfig) -> anyhow::Result<()> {
    let settings = chunking.apply(ExtractionSettings::from_config(config));
    let entry = ParserRegistry::with_defaults().parse(path)?;
    let chunker = Chunker::new(settings.pipeline.chunk_size, settings.pipeline.chunk_overlap)?;

    let text = entry.to_text();
    let pieces = chunker.split(&text);
    info!(document = %entry.name, chunks = pieces.len(), "Chunked document");

    let unit = if chunker.sizer().is_token_based() {
        "tokens"
    } else {
        "chars"
    };
    println!(
        "{}: {} {} in {} chunk(s) (max {}, overlap {})",
        entry.name,
        chunker.measure(&text),
        unit,
        pieces.len(),
        chunker.max_tokens(),
        chunker.overlap_tokens()
    );
    for (i, piece) in pieces.iter().enumerate() {
        println!("  #{:<4} {:>6} {unit}", i + 1, chunker.measure(piece));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &config.logging);

    match cli.command {
        Commands::Generate(args) => generate(args, &config).await,
        Commands::Chunks { path, chunking } => chunks(&path, &chunking, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_overrides() {
        let cli = Cli::try_parse_from([
            "ontograph",
            "generate",
            "a.txt",
            "b.pdf",
            "--model",
            "llama3",
            "--strategy",
            "nodes-first",
            "--chunk-size",
            "1000",
            "--chunk-overlap",
            "50",
            "--provider",
            "ollama",
        ])
        .unwrap();

        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.output, PathBuf::from("graph.html"));

        let settings = args.settings(&AppConfig::default());
        assert_eq!(settings.llm.model, "llama3");
        assert_eq!(settings.llm.provider, LlmProvider::Ollama);
        assert_eq!(settings.pipeline.strategy, ExtractionStrategy::NodesFirst);
        assert_eq!(settings.pipeline.chunk_size, 1000);
        assert_eq!(settings.pipeline.chunk_overlap, 50);
        // Untouched fields keep config defaults
        assert_eq!(settings.llm.base_url, "http://localhost:1234/v1");
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        assert!(Cli::try_parse_from(["ontograph", "generate", "--strategy", "random"]).is_err());
    }

    #[test]
    fn test_chunks_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Alice works at Acme.\n\nAcme is located in Reno.").unwrap();

        let chunking = ChunkArgs {
            chunk_size: Some(100),
            chunk_overlap: Some(0),
        };
        assert!(chunks(&path, &chunking, &AppConfig::default()).is_ok());

        let bad = ChunkArgs {
            chunk_size: Some(10),
            chunk_overlap: Some(10),
        };
        assert!(chunks(&path, &bad, &AppConfig::default()).is_err());
    }
}
