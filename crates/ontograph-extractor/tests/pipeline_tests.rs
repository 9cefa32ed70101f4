//! Pipeline integration tests with scripted LLM doubles

use async_trait::async_trait;
use ontograph_core::{
    DocumentEntry, ExtractionStrategy, LlmClient, OntographError, PipelineConfig, Result, Table,
};
use ontograph_extractor::OntologyPipeline;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TYPES: &str = r#"{"node_types": ["Person", "Org", "Place"]}"#;
const STUB_GRAPH: &str = r#"{"nodes":[{"id":"alice","type":"Person"},{"id":"acme","type":"Org"},{"id":"reno","type":"Place"}],"relationships":[{"source":"alice","target":"acme","type":"WORKS_AT"},{"source":"acme","target":"reno","type":"LOCATED_IN"}]}"#;

/// Answers stage 1 with `first` and stage 2 with `graph`
struct StubLlm {
    first: String,
    graph: String,
    calls: AtomicUsize,
}

impl StubLlm {
    fn new(graph: &str) -> Arc<Self> {
        Self::with_first(TYPES, graph)
    }

    fn with_first(first: &str, graph: &str) -> Arc<Self> {
        Arc::new(Self {
            first: first.to_string(),
            graph: graph.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

fn is_first_stage(system: &str) -> bool {
    system.contains("between 5 and 15") || system.contains("5 to 20 words")
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if user.contains("FAIL") {
            return Err(OntographError::LlmError("upstream error".to_string()));
        }
        if is_first_stage(system) {
            Ok(self.first.clone())
        } else {
            Ok(self.graph.clone())
        }
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Tracks how many calls overlap
struct SlowLlm {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl LlmClient for SlowLlm {
    async fn complete(&self, system: &str, _user: &str) -> Result<String> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        if is_first_stage(system) {
            Ok(TYPES.to_string())
        } else {
            Ok(STUB_GRAPH.to_string())
        }
    }

    fn model(&self) -> &str {
        "slow"
    }
}

fn pipeline(llm: Arc<dyn LlmClient>) -> OntologyPipeline {
    OntologyPipeline::new(llm, &PipelineConfig::default()).unwrap()
}

#[tokio::test]
async fn test_end_to_end_single_document() {
    let llm = StubLlm::new(STUB_GRAPH);
    let entries = vec![DocumentEntry::text(
        "doc1",
        "Alice works at Acme. Acme is located in Reno.",
    )];

    let (graph, stats) = pipeline(llm.clone()).run_with_stats(&entries).await;
    let graph = graph.expect("graph");

    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["Alice", "Acme", "Reno"]);
    assert_eq!(graph.relationship_count(), 2);
    for node in &graph.nodes {
        assert_eq!(node.properties.documents.len(), 1);
        assert!(node.properties.documents.contains("doc1"));
    }

    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    assert_eq!(graph.source.label, "User provided content");
}

#[tokio::test]
async fn test_ghost_relationship_dropped() {
    let graph_json = r#"{"nodes":[{"id":"alice","type":"Person"},{"id":"acme","type":"Org"}],"relationships":[{"source":"alice","target":"acme","type":"WORKS_AT"},{"source":"ghost","target":"acme","type":"HAUNTS"}]}"#;
    let entries = vec![DocumentEntry::text("doc1", "Alice works at Acme.")];

    let graph = pipeline(StubLlm::new(graph_json))
        .run(&entries)
        .await
        .unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.relationship_count(), 1);
    assert!(graph.node("Ghost").is_none());
    assert_eq!(graph.relationships[0].rel_type, "WORKS_AT");
}

#[tokio::test]
async fn test_documents_unioned_across_entries() {
    let entries = vec![
        DocumentEntry::text("a.txt", "Alice works at Acme."),
        DocumentEntry::raw_text("Acme is located in Reno."),
    ];

    let graph = pipeline(StubLlm::new(STUB_GRAPH))
        .run(&entries)
        .await
        .unwrap();

    let docs: Vec<&str> = graph.documents().into_iter().collect();
    assert_eq!(docs, ["a.txt", "raw_text"]);
    assert_eq!(graph.node_count(), 3);
    // Each chunk contributed both relationships
    assert_eq!(graph.relationship_count(), 4);
}

#[tokio::test]
async fn test_gate_ceiling_across_documents() {
    let llm = Arc::new(SlowLlm {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let entries: Vec<_> = (0..30)
        .map(|i| DocumentEntry::text(format!("doc{i}"), format!("Alice works at Acme, part {i}.")))
        .collect();

    let (graph, stats) = pipeline(llm.clone()).run_with_stats(&entries).await;

    assert!(graph.is_some());
    assert_eq!(stats.chunks, 30);
    assert_eq!(stats.succeeded, 30);
    let peak = llm.peak.load(Ordering::SeqCst);
    assert!(peak <= 10, "peak in-flight was {peak}");
    assert!(peak > 1);
}

#[tokio::test]
async fn test_failed_chunk_isolated() {
    let entries = vec![
        DocumentEntry::text("good", "Alice works at Acme."),
        DocumentEntry::text("bad", "FAIL this one."),
    ];

    let (graph, stats) = pipeline(StubLlm::new(STUB_GRAPH))
        .run_with_stats(&entries)
        .await;
    let graph = graph.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);
    let docs: Vec<&str> = graph.documents().into_iter().collect();
    assert_eq!(docs, ["good"]);
}

#[tokio::test]
async fn test_no_input_is_none() {
    let llm = StubLlm::new(STUB_GRAPH);
    assert!(pipeline(llm.clone()).run(&[]).await.is_none());

    let blank = vec![DocumentEntry::text("empty", "   \n\t ")];
    let (graph, stats) = pipeline(llm.clone()).run_with_stats(&blank).await;
    assert!(graph.is_none());
    assert_eq!(stats.skipped_documents, 1);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_chunks_failing_is_none() {
    let entries = vec![DocumentEntry::text("doc", "FAIL everything")];
    assert!(pipeline(StubLlm::new(STUB_GRAPH)).run(&entries).await.is_none());
}

#[tokio::test]
async fn test_graph_without_nodes_is_none() {
    let entries = vec![DocumentEntry::text("doc", "Nothing to see.")];
    let empty = r#"{"nodes": [], "relationships": []}"#;
    assert!(pipeline(StubLlm::new(empty)).run(&entries).await.is_none());
}

#[tokio::test]
async fn test_nodes_first_strategy() {
    let nodes = r#"{"nodes":[{"id":"alice","type":"Person"},{"id":"acme","type":"Org"},{"id":"reno","type":"Place"}]}"#;
    let llm = StubLlm::with_first(nodes, STUB_GRAPH);
    let config = PipelineConfig {
        strategy: ExtractionStrategy::NodesFirst,
        ..PipelineConfig::default()
    };

    let entries = vec![DocumentEntry::text("doc1", "Alice works at Acme in Reno.")];
    let graph = OntologyPipeline::new(llm, &config)
        .unwrap()
        .run(&entries)
        .await
        .unwrap();
    assert_eq!(graph.node_count(), 3);
}

#[tokio::test]
async fn test_table_entry_is_extracted() {
    let table = Table::new(vec!["name".into(), "employer".into()])
        .with_row(vec!["Alice".into(), "Acme".into()]);
    let entries = vec![DocumentEntry::table("people.csv", table)];

    let graph = pipeline(StubLlm::new(STUB_GRAPH))
        .run(&entries)
        .await
        .unwrap();
    assert!(graph.documents().contains("people.csv"));
}

#[test]
fn test_invalid_chunk_config_rejected() {
    let config = PipelineConfig {
        chunk_size: 100,
        chunk_overlap: 100,
        ..PipelineConfig::default()
    };
    assert!(OntologyPipeline::new(StubLlm::new(STUB_GRAPH), &config).is_err());
}
