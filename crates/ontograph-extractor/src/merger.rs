//! Graph merge
//!
//! Two passes over the partial records of a run. Nodes first, so that every
//! relationship is resolved against the complete node set regardless of
//! which chunk produced it.

use ontograph_core::{MergedGraph, Node, PartialRecord, Relationship};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::cleanup::normalize_id;

/// Merge partial records into one de-duplicated graph
///
/// Nodes keep first-seen order and the first-seen type; their document sets
/// are unioned. Relationships whose endpoints do not resolve to a merged
/// node are dropped. Duplicate relationships are kept.
pub fn merge(records: &[PartialRecord]) -> MergedGraph {
    let mut nodes: Vec<Node> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        for entry in &record.nodes {
            let id = normalize_id(&entry.id);
            let node_type = entry.node_type.trim();
            if id.is_empty() || node_type.is_empty() {
                warn!(id = %entry.id, node_type = %entry.node_type, "Skipping blank node");
                continue;
            }

            match index.get(&id) {
                Some(&i) => {
                    nodes[i].add_document(entry.document.as_str());
                }
                None => {
                    index.insert(id.clone(), nodes.len());
                    nodes.push(Node::new(id, node_type).with_document(entry.document.as_str()));
                }
            }
        }
    }

    let mut relationships = Vec::new();
    let mut dropped = 0usize;

    for record in records {
        for entry in &record.relationships {
            let rel_type = entry.rel_type.trim();
            if rel_type.is_empty() {
                warn!(source = %entry.source, target = %entry.target, "Dropping untyped relationship");
                dropped += 1;
                continue;
            }

            let source = normalize_id(&entry.source);
            let target = normalize_id(&entry.target);
            if !index.contains_key(&source) || !index.contains_key(&target) {
                warn!(%source, %target, rel_type, "Dropping relationship with unknown endpoint");
                dropped += 1;
                continue;
            }

            relationships.push(Relationship::new(source, target, rel_type));
        }
    }

    info!(
        records = records.len(),
        nodes = nodes.len(),
        relationships = relationships.len(),
        dropped,
        "Merged graph"
    );

    MergedGraph::new(nodes, relationships)
}
