use std::collections::HashMap;

use agentflow_config::{EdgeDef, NodeDef, NodeKind};

/// Edges entering `target_id`, ordered by the source's output slot.
///
/// Edges whose slot cannot be parsed keep their relative order and sort after
/// every parsed one.
pub fn incoming_edges<'a>(edges: &'a [EdgeDef], target_id: &str) -> Vec<&'a EdgeDef> {
  let mut incoming: Vec<&EdgeDef> = edges.iter().filter(|e| e.target == target_id).collect();
  // sort_by_key is stable
  incoming.sort_by_key(|e| match e.source_output_slot() {
    Some(slot) => (0, slot),
    None => (1, 0),
  });
  incoming
}

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node kinds, keyed by node id.
  kinds: HashMap<String, NodeKind>,
  /// Incoming edges per node, in output-slot order.
  incoming: HashMap<String, Vec<EdgeDef>>,
  /// Outgoing edges per node, in declaration order.
  outgoing: HashMap<String, Vec<EdgeDef>>,
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Nodes with no incoming edges, sorted.
  entry_points: Vec<String>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  pub fn new(nodes: &HashMap<String, NodeDef>, edges: &[EdgeDef]) -> Self {
    let kinds: HashMap<String, NodeKind> = nodes
      .iter()
      .map(|(id, node)| (id.clone(), node.kind))
      .collect();

    let mut incoming: HashMap<String, Vec<EdgeDef>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<EdgeDef>> = HashMap::new();
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node_id in nodes.keys() {
      let ordered: Vec<EdgeDef> = incoming_edges(edges, node_id)
        .into_iter()
        .cloned()
        .collect();
      let mut upstream: Vec<String> = Vec::with_capacity(ordered.len());
      for edge in &ordered {
        if !upstream.contains(&edge.source) {
          upstream.push(edge.source.clone());
        }
      }
      reverse_adjacency.insert(node_id.clone(), upstream);
      incoming.insert(node_id.clone(), ordered);
      adjacency.entry(node_id.clone()).or_default();
      outgoing.entry(node_id.clone()).or_default();
    }

    for edge in edges {
      outgoing
        .entry(edge.source.clone())
        .or_default()
        .push(edge.clone());
      let downstream = adjacency.entry(edge.source.clone()).or_default();
      if !downstream.contains(&edge.target) {
        downstream.push(edge.target.clone());
      }
    }

    let mut entry_points: Vec<String> = nodes
      .keys()
      .filter(|id| reverse_adjacency.get(*id).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();
    entry_points.sort();

    Self {
      kinds,
      incoming,
      outgoing,
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Kind of a node, if it is part of the graph.
  pub fn kind(&self, node_id: &str) -> Option<NodeKind> {
    self.kinds.get(node_id).copied()
  }

  /// True if the node selects between output branches.
  pub fn is_decision(&self, node_id: &str) -> bool {
    self.kind(node_id).is_some_and(NodeKind::is_decision)
  }

  /// Get entry points (nodes with no incoming edges).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Edges entering a node, ordered by the source output slot.
  pub fn incoming(&self, node_id: &str) -> &[EdgeDef] {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Edges leaving a node.
  pub fn outgoing(&self, node_id: &str) -> &[EdgeDef] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node, in incoming-edge order.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
