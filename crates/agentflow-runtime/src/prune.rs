//! Branch pruning after a decision node has run.

use std::collections::BTreeSet;

use agentflow_graph::{Graph, NodeDef};

use crate::output::NodeOutput;

/// Targets of the branches a decision node did not select.
///
/// An outgoing edge is pruned when its output slot has no condition entry or
/// the entry is unfulfilled. Targets that the same decision also reaches
/// through a fulfilled edge are kept. Non-decision nodes, and decision outputs
/// without a `conditions` list, prune nothing.
pub fn prune_targets(node: &NodeDef, output: &NodeOutput, graph: &Graph) -> BTreeSet<String> {
  if !node.kind.is_decision() {
    return BTreeSet::new();
  }
  let Some(conditions) = &output.conditions else {
    return BTreeSet::new();
  };

  let mut pruned = BTreeSet::new();
  let mut selected = BTreeSet::new();
  for edge in graph.outgoing(&node.id) {
    let fulfilled = edge
      .source_output_slot()
      .and_then(|slot| conditions.get(slot))
      .is_some_and(|c| c.is_fulfilled);
    if fulfilled {
      selected.insert(edge.target.clone());
    } else {
      pruned.insert(edge.target.clone());
    }
  }

  pruned.retain(|target| !selected.contains(target));
  pruned
}
