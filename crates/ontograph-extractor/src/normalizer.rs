//! Response normalization
//!
//! The single place where untyped LLM output becomes a [`PartialRecord`].
//! Malformed entries are dropped here, so the merger only sees nodes with an
//! id and type and relationships with both endpoints and a type.

use ontograph_core::{NodeRecord, PartialRecord, RelationshipRecord};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::repair::repair_json;
use crate::{json_kind, ParseError};

/// Repair, parse and validate a graph response, stamping nodes with `document`
pub fn normalize(raw: &str, document: &str) -> Result<PartialRecord, ParseError> {
    let repaired = repair_json(raw)?;
    let value: Value =
        serde_json::from_str(&repaired).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let object = match value {
        Value::Object(object) => object,
        other => return Err(ParseError::NotAnObject(json_kind(&other))),
    };

    if !object.contains_key("nodes") || !object.contains_key("relationships") {
        return Err(ParseError::MissingKeys);
    }

    let nodes = entries(&object, "nodes")?
        .iter()
        .filter_map(|entry| {
            let node = node_record(entry, document);
            if node.is_none() {
                warn!(%document, entry = %entry, "Skipping malformed node");
            }
            node
        })
        .collect::<Vec<_>>();

    let relationships = entries(&object, "relationships")?
        .iter()
        .filter_map(|entry| {
            let rel = relationship_record(entry);
            if rel.is_none() {
                warn!(%document, entry = %entry, "Skipping malformed relationship");
            }
            rel
        })
        .collect::<Vec<_>>();

    debug!(
        %document,
        nodes = nodes.len(),
        relationships = relationships.len(),
        "Normalized response"
    );

    Ok(PartialRecord::new(nodes, relationships))
}

fn entries<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a [Value], ParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ParseError::InvalidField {
            key,
            found: json_kind(other),
        }),
    }
}

/// Non-empty trimmed text of a string or number
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Endpoint given as an id or as a nested node object
fn endpoint(value: &Value) -> Option<String> {
    match value {
        Value::Object(node) => node.get("id").and_then(scalar_text),
        other => scalar_text(other),
    }
}

fn node_record(entry: &Value, document: &str) -> Option<NodeRecord> {
    let object = entry.as_object()?;
    let id = object.get("id").and_then(scalar_text)?;
    let node_type = object.get("type").and_then(scalar_text)?;
    Some(NodeRecord::new(id, node_type, document))
}

fn relationship_record(entry: &Value) -> Option<RelationshipRecord> {
    let object = entry.as_object()?;
    let source = object.get("source").and_then(endpoint)?;
    let target = object.get("target").and_then(endpoint)?;
    let rel_type = object.get("type").and_then(scalar_text)?;
    Some(RelationshipRecord::new(source, target, rel_type))
}
