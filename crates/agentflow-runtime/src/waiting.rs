//! Per-run scheduling state of a single node.

use std::collections::{BTreeMap, BTreeSet};

use agentflow_graph::{Graph, analyze_dependencies};

use crate::output::NodeInput;

/// A node that has not run yet, and what it has received so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitingNode {
  pub node_id: String,
  /// Predecessor id -> delivered output.
  pub received_inputs: BTreeMap<String, NodeInput>,
  /// Predecessors that must all deliver.
  pub expected_inputs: BTreeSet<String>,
  /// Decision ancestor id -> predecessors of which one must deliver.
  pub conditional_groups: BTreeMap<String, BTreeSet<String>>,
}

impl WaitingNode {
  /// Derive a node's join requirements from the graph.
  pub fn setup(node_id: &str, graph: &Graph) -> Self {
    let deps = analyze_dependencies(node_id, graph);
    Self {
      node_id: node_id.to_string(),
      received_inputs: BTreeMap::new(),
      expected_inputs: deps.expected,
      conditional_groups: deps.conditional_groups,
    }
  }

  pub fn is_conditional(&self) -> bool {
    !self.conditional_groups.is_empty()
  }

  /// Record a predecessor's output.
  pub fn receive(&mut self, from: impl Into<String>, input: NodeInput) {
    self.received_inputs.insert(from.into(), input);
  }

  /// True once every expected predecessor has delivered and every conditional
  /// group has at least one delivered member.
  pub fn is_ready(&self) -> bool {
    self
      .expected_inputs
      .iter()
      .all(|id| self.received_inputs.contains_key(id))
      && self
        .conditional_groups
        .values()
        .all(|group| group.iter().any(|id| self.received_inputs.contains_key(id)))
  }

  /// True if the ignored predecessors make readiness unreachable.
  pub fn is_blocked_by(&self, ignored: &BTreeSet<String>) -> bool {
    self.expected_inputs.iter().any(|id| ignored.contains(id))
      || self
        .conditional_groups
        .values()
        .any(|group| group.iter().all(|id| ignored.contains(id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::NodeOutput;

  fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
  }

  fn waiting(expected: &[&str], groups: &[(&str, &[&str])]) -> WaitingNode {
    WaitingNode {
      node_id: "node".to_string(),
      received_inputs: BTreeMap::new(),
      expected_inputs: set(expected),
      conditional_groups: groups
        .iter()
        .map(|(decision, members)| (decision.to_string(), set(members)))
        .collect(),
    }
  }

  fn deliver(node: &mut WaitingNode, from: &str) {
    node.receive(from, NodeInput::Output(NodeOutput::from_text(from)));
  }

  #[test]
  fn test_no_dependencies_is_ready() {
    let node = waiting(&[], &[]);
    assert!(node.is_ready());
    assert!(!node.is_conditional());
  }

  #[test]
  fn test_expected_requires_all() {
    let mut node = waiting(&["a", "b"], &[]);
    assert!(!node.is_ready());
    deliver(&mut node, "a");
    assert!(!node.is_ready());
    deliver(&mut node, "b");
    assert!(node.is_ready());
  }

  #[test]
  fn test_group_requires_any() {
    let mut node = waiting(&[], &[("cond", &["a", "b"])]);
    assert!(node.is_conditional());
    assert!(!node.is_ready());
    deliver(&mut node, "b");
    assert!(node.is_ready());
  }

  #[test]
  fn test_groups_and_expected_combine() {
    let mut node = waiting(&["x"], &[("c1", &["a", "b"]), ("c2", &["d"])]);
    deliver(&mut node, "a");
    deliver(&mut node, "d");
    assert!(!node.is_ready());
    deliver(&mut node, "x");
    assert!(node.is_ready());
  }

  #[test]
  fn test_unrelated_input_does_not_satisfy() {
    let mut node = waiting(&["a"], &[("cond", &["b"])]);
    deliver(&mut node, "zzz");
    assert!(!node.is_ready());
  }

  #[test]
  fn test_blocked_by_ignored() {
    let node = waiting(&["x"], &[("cond", &["a", "b"])]);
    assert!(!node.is_blocked_by(&set(&["a"])));
    assert!(node.is_blocked_by(&set(&["a", "b"])));
    assert!(node.is_blocked_by(&set(&["x"])));
    assert!(!waiting(&[], &[]).is_blocked_by(&set(&["x"])));
  }
}
