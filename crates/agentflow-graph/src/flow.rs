use std::collections::HashMap;

use agentflow_config::{EdgeDef, FlowDef, NodeDef};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::Graph;

/// A validated flow ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
  pub flow_id: String,
  pub name: String,
  pub nodes: HashMap<String, NodeDef>,
  pub edges: Vec<EdgeDef>,
}

impl Flow {
  /// Validate a flow definition.
  pub fn from_def(def: FlowDef) -> Result<Self, GraphError> {
    let mut nodes = HashMap::with_capacity(def.nodes.len());
    for node in def.nodes {
      if nodes.contains_key(&node.id) {
        return Err(GraphError::DuplicateNode(node.id));
      }
      nodes.insert(node.id.clone(), node);
    }

    for edge in &def.edges {
      if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
        return Err(GraphError::InvalidEdge {
          edge_id: edge.id.clone(),
          source_id: edge.source.clone(),
          target_id: edge.target.clone(),
        });
      }
    }

    Ok(Self {
      flow_id: def.flow_id,
      name: def.name,
      nodes,
      edges: def.edges,
    })
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.get(node_id)
  }

  /// The sub-flow of nodes directly enclosed by `parent_id`.
  ///
  /// Only edges with both ends inside the body are kept.
  pub fn body_of(&self, parent_id: &str) -> Flow {
    self.retain(|node| node.parent_node.as_deref() == Some(parent_id))
  }

  /// The flow without any iteration bodies.
  pub fn top_level(&self) -> Flow {
    self.retain(|node| !node.is_nested())
  }

  fn retain(&self, keep: impl Fn(&NodeDef) -> bool) -> Flow {
    let nodes: HashMap<String, NodeDef> = self
      .nodes
      .iter()
      .filter(|(_, node)| keep(node))
      .map(|(id, node)| (id.clone(), node.clone()))
      .collect();
    let edges = self
      .edges
      .iter()
      .filter(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target))
      .cloned()
      .collect();

    Flow {
      flow_id: self.flow_id.clone(),
      name: self.name.clone(),
      nodes,
      edges,
    }
  }
}
