//! Join requirements derived from the static graph.
//!
//! Every predecessor of a node is either a hard dependency (it always runs, so
//! the node must wait for it) or is gated by a decision ancestor. Predecessors
//! gated by the same decision form a conditional group: once the decision has
//! picked its branches, one arriving member is enough to satisfy the group.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// What a node must receive before it can run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
  /// Predecessors that must all deliver (AND-join).
  pub expected: BTreeSet<String>,
  /// Decision ancestor id -> predecessors gated by that decision.
  pub conditional_groups: BTreeMap<String, BTreeSet<String>>,
}

impl Dependencies {
  pub fn is_conditional(&self) -> bool {
    !self.conditional_groups.is_empty()
  }

  /// Every predecessor id named by these dependencies.
  pub fn predecessors(&self) -> impl Iterator<Item = &String> {
    self
      .expected
      .iter()
      .chain(self.conditional_groups.values().flatten())
  }
}

/// Compute the join requirements of `node_id`.
pub fn analyze_dependencies(node_id: &str, graph: &Graph) -> Dependencies {
  let mut deps = Dependencies::default();

  for edge in graph.incoming(node_id) {
    let predecessor = &edge.source;
    match find_decision_ancestor(predecessor, graph) {
      Some(decision) => {
        deps
          .conditional_groups
          .entry(decision)
          .or_default()
          .insert(predecessor.clone());
      }
      None => {
        deps.expected.insert(predecessor.clone());
      }
    }
  }

  deps
}

/// Find the decision node, if any, that gates whether `start` runs.
///
/// Returns `start` itself when it is a decision node. Otherwise walks upstream
/// breadth-first, visiting each ancestor once, and returns the first decision
/// node reached.
pub fn find_decision_ancestor(start: &str, graph: &Graph) -> Option<String> {
  if graph.is_decision(start) {
    return Some(start.to_string());
  }

  let mut visited: HashSet<&str> = HashSet::from([start]);
  let mut queue: VecDeque<&str> = VecDeque::from([start]);

  while let Some(current) = queue.pop_front() {
    for upstream in graph.upstream(current) {
      if !visited.insert(upstream.as_str()) {
        continue;
      }
      if graph.is_decision(upstream) {
        return Some(upstream.clone());
      }
      queue.push_back(upstream.as_str());
    }
  }

  None
}
