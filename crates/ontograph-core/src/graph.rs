//! Extraction records and the merged knowledge graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Partial Extraction Records
// ============================================================================

/// A node as returned for a single chunk, already validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: String,

    /// Name of the document the chunk came from
    pub document: String,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            document: document.into(),
        }
    }
}

/// A relationship as returned for a single chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,

    #[serde(rename = "type")]
    pub rel_type: String,
}

impl RelationshipRecord {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Output of one successful chunk extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialRecord {
    pub nodes: Vec<NodeRecord>,
    pub relationships: Vec<RelationshipRecord>,
}

impl PartialRecord {
    pub fn new(nodes: Vec<NodeRecord>, relationships: Vec<RelationshipRecord>) -> Self {
        Self {
            nodes,
            relationships,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

// ============================================================================
// Merged Graph
// ============================================================================

/// Properties attached to a merged node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProperties {
    /// Every document this node was extracted from
    #[serde(rename = "document")]
    pub documents: BTreeSet<String>,

    /// Incoming relationship count, filled in by the renderer
    pub node_weight: u32,

    /// Outgoing relationship count, filled in by the renderer
    pub edge_weight: u32,
}

/// A de-duplicated entity in the merged graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Normalized identifier, unique within a graph
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: String,

    pub properties: NodeProperties,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: NodeProperties::default(),
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.add_document(document);
        self
    }

    /// Record another source document; returns false if already present
    pub fn add_document(&mut self, document: impl Into<String>) -> bool {
        self.properties.documents.insert(document.into())
    }
}

/// A directed edge between two node ids of the same graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,

    #[serde(rename = "type")]
    pub rel_type: String,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Where a merged graph came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub label: String,
    pub kind: String,
}

impl Provenance {
    /// Tag for graphs built from user-supplied documents
    pub fn user_input() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            label: "User provided content".to_string(),
            kind: "user_input".to_string(),
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::user_input()
    }
}

/// The consolidated graph produced by one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedGraph {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub source: Provenance,
}

impl MergedGraph {
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Self {
            nodes,
            relationships,
            source: Provenance::user_input(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Look up a node by normalized id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// All source documents referenced by any node
    pub fn documents(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .flat_map(|n| n.properties.documents.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_documents_are_a_set() {
        let mut node = Node::new("Alice", "Person").with_document("doc1");
        assert!(!node.add_document("doc1"));
        assert!(node.add_document("doc2"));
        assert_eq!(node.properties.documents.len(), 2);
    }

    #[test]
    fn test_node_serializes_type_and_document() {
        let node = Node::new("Acme", "Org").with_document("doc1");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "Org");
        assert_eq!(json["properties"]["document"][0], "doc1");
        assert_eq!(json["properties"]["node_weight"], 0);
    }

    #[test]
    fn test_provenance_user_input() {
        let provenance = Provenance::user_input();
        assert_eq!(provenance.label, "User provided content");
        assert_eq!(provenance.kind, "user_input");
    }

    #[test]
    fn test_graph_lookup_and_documents() {
        let graph = MergedGraph::new(
            vec![
                Node::new("Alice", "Person").with_document("doc1"),
                Node::new("Reno", "Place").with_document("doc2"),
            ],
            vec![Relationship::new("Alice", "Reno", "LIVES_IN")],
        );

        assert_eq!(graph.node("Reno").unwrap().node_type, "Place");
        assert!(graph.node("Bob").is_none());
        assert_eq!(graph.documents().into_iter().collect::<Vec<_>>(), ["doc1", "doc2"]);
        assert_eq!(graph.relationship_count(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let graph = MergedGraph::empty();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
    }
}
