//! ontograph Render - Interactive HTML for merged graphs
//!
//! Produces one self-contained page per graph: vis-network loaded from a CDN,
//! a force-directed layout on a dark background and a property filter menu.
//! Degree weights are computed here, on a copy, so the merged graph handed
//! in is never modified.

use ontograph_core::MergedGraph;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

const TEMPLATE: &str = include_str!("../assets/graph.html");

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to serialize graph data: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

// ============================================================================
// Weighting
// ============================================================================

/// Copy of `graph` with degree weights filled in
///
/// `node_weight` counts incoming relationships and `edge_weight` outgoing
/// ones. Every relationship counts, duplicates included.
pub fn weighted(graph: &MergedGraph) -> MergedGraph {
    let mut copy = graph.clone();
    let index = node_index(graph);

    for node in &mut copy.nodes {
        node.properties.node_weight = 0;
        node.properties.edge_weight = 0;
    }

    for rel in &graph.relationships {
        let endpoints = (index.get(rel.source.as_str()), index.get(rel.target.as_str()));
        if let (Some(&s), Some(&t)) = endpoints {
            copy.nodes[t].properties.node_weight += 1;
            copy.nodes[s].properties.edge_weight += 1;
        }
    }

    copy
}

/// Position of each node by id
fn node_index(graph: &MergedGraph) -> HashMap<&str, usize> {
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect()
}

// ============================================================================
// Renderer
// ============================================================================

/// Page-level presentation settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub height: String,
    pub width: String,
    pub background: String,
    pub font_color: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Knowledge Graph".to_string(),
            height: "3000px".to_string(),
            width: "4000px".to_string(),
            background: "#222222".to_string(),
            font_color: "white".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct VisNode<'a> {
    id: &'a str,
    label: &'a str,
    /// Tooltip: source documents
    title: String,
    group: &'a str,
    #[serde(rename = "type")]
    node_type: &'a str,
    document: Vec<&'a str>,
    node_weight: u32,
    edge_weight: u32,
    font: Value,
}

#[derive(Debug, Serialize)]
struct VisEdge {
    id: String,
    from: String,
    to: String,
    label: String,
    #[serde(rename = "type")]
    rel_type: String,
    edge_weight: u32,
    font: Value,
}

/// Renders merged graphs to HTML
#[derive(Debug, Clone, Default)]
pub struct GraphRenderer {
    options: RenderOptions,
}

impl GraphRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render a graph, or `None` when it has neither nodes nor relationships
    pub fn render(&self, graph: &MergedGraph) -> Result<Option<String>> {
        if graph.nodes.is_empty() && graph.relationships.is_empty() {
            return Ok(None);
        }

        let graph = weighted(graph);
        let (nodes, edges) = self.vis_data(&graph);
        debug!(nodes = nodes.len(), edges = edges.len(), "Rendering graph");

        let page = fill(
            TEMPLATE,
            &[
                ("title", escape_html(&self.options.title)),
                ("background", escape_html(&self.options.background)),
                ("width", escape_html(&self.options.width)),
                ("height", escape_html(&self.options.height)),
                ("options", script_json(&self.vis_options())?),
                ("nodes", script_json(&nodes)?),
                ("edges", script_json(&edges)?),
            ],
        );
        Ok(Some(page))
    }

    /// Nodes touching at least one relationship, and every relationship
    fn vis_data<'a>(&self, graph: &'a MergedGraph) -> (Vec<VisNode<'a>>, Vec<VisEdge>) {
        let connected: BTreeSet<&str> = graph
            .relationships
            .iter()
            .flat_map(|r| [r.source.as_str(), r.target.as_str()])
            .collect();

        let nodes = graph
            .nodes
            .iter()
            .filter(|n| connected.contains(n.id.as_str()))
            .map(|n| {
                let documents: Vec<&str> =
                    n.properties.documents.iter().map(String::as_str).collect();
                VisNode {
                    id: &n.id,
                    label: &n.id,
                    title: documents.join(" "),
                    group: &n.node_type,
                    node_type: &n.node_type,
                    document: documents,
                    node_weight: n.properties.node_weight,
                    edge_weight: n.properties.edge_weight,
                    font: json!({
                        "size": 18,
                        "face": "Arial",
                        "color": self.options.font_color,
                        "strokeWidth": 2,
                        "strokeColor": "#000000"
                    }),
                }
            })
            .collect();

        let index = node_index(graph);
        let edges = graph
            .relationships
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                index.get(r.source.as_str())?;
                let target = &graph.nodes[*index.get(r.target.as_str())?];
                Some(VisEdge {
                    id: format!("e{i}"),
                    from: r.source.clone(),
                    to: r.target.clone(),
                    label: r.rel_type.to_lowercase(),
                    rel_type: r.rel_type.clone(),
                    edge_weight: target.properties.edge_weight,
                    font: json!({
                        "size": 14,
                        "face": "Arial",
                        "color": "lightgray",
                        "strokeWidth": 1,
                        "strokeColor": "#000000"
                    }),
                })
            })
            .collect();

        (nodes, edges)
    }

    fn vis_options(&self) -> Value {
        json!({
            "physics": {
                "enabled": true,
                "solver": "forceAtlas2Based",
                "stabilization": {
                    "enabled": true,
                    "iterations": 150,
                    "updateInterval": 25
                },
                "minVelocity": 0.1
            },
            "interaction": {
                "navigationButtons": true,
                "keyboard": true,
                "zoomView": true,
                "dragView": true
            },
            "nodes": {
                "shape": "dot",
                "size": 20,
                "font": {
                    "face": "Arial",
                    "color": self.options.font_color,
                    "strokeWidth": 2,
                    "strokeColor": "#000000",
                    "multi": "html",
                    "vadjust": 0
                }
            },
            "edges": {
                "font": {
                    "face": "Arial",
                    "color": "lightgray",
                    "size": 14,
                    "strokeWidth": 1,
                    "strokeColor": "#000000",
                    "align": "middle"
                },
                "arrows": "to",
                "smooth": {
                    "enabled": true,
                    "type": "dynamic"
                }
            }
        })
    }
}

/// Render with default options
pub fn render(graph: &MergedGraph) -> Result<Option<String>> {
    GraphRenderer::new().render(graph)
}

/// JSON safe to embed in a `<script>` element
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let text = serde_json::to_string(value)?;
    Ok(text
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Substitute `{{key}}` slots in one pass, so inserted text is never rescanned
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let slot = after
            .find("}}")
            .and_then(|end| values.iter().find(|(k, _)| *k == &after[..end]).map(|(_, v)| (end, v)));

        match slot {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
