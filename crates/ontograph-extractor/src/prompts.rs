//! System prompts for the two extraction stages

use ontograph_core::ExtractionStrategy;

const NODE_TYPES_SLOT: &str = "{node_types}";
const NODES_SLOT: &str = "{nodes}";

/// System prompts for both strategies
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Ontology-first stage 1: propose node types
    pub ontology_types: String,
    /// Ontology-first stage 2: graph constrained to `{node_types}`
    pub ontology_graph: String,
    /// Nodes-first stage 1: nodes only
    pub nodes_only: String,
    /// Nodes-first stage 2: relationships between `{nodes}`
    pub nodes_relationships: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            ontology_types: include_str!("prompts/ontology_types.txt").to_string(),
            ontology_graph: include_str!("prompts/ontology_graph.txt").to_string(),
            nodes_only: include_str!("prompts/nodes_only.txt").to_string(),
            nodes_relationships: include_str!("prompts/nodes_relationships.txt").to_string(),
        }
    }
}

impl PromptSet {
    /// System prompt for the first exchange
    pub fn first_stage(&self, strategy: ExtractionStrategy) -> &str {
        match strategy {
            ExtractionStrategy::OntologyFirst => &self.ontology_types,
            ExtractionStrategy::NodesFirst => &self.nodes_only,
        }
    }

    /// System prompt for the second exchange, embedding the first response
    pub fn second_stage(&self, strategy: ExtractionStrategy, first_response: &str) -> String {
        let first_response = first_response.trim();
        match strategy {
            ExtractionStrategy::OntologyFirst => {
                self.ontology_graph.replace(NODE_TYPES_SLOT, first_response)
            }
            ExtractionStrategy::NodesFirst => {
                self.nodes_relationships.replace(NODES_SLOT, first_response)
            }
        }
    }
}
