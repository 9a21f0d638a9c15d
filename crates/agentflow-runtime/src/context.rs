//! Per-run scheduling state.
//!
//! A [`RunContext`] is created for every execution (and for every iteration of
//! an iteration body) and owns the flow snapshot, the waiting table, the
//! ignored set and the invoked set exclusively. Nothing in it is shared
//! between runs.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use agentflow_graph::{Flow, Graph};
use serde::{Deserialize, Serialize};

use crate::combine::combine;
use crate::error::RuntimeError;
use crate::output::{NodeInput, NodeOutput};
use crate::prune::prune_targets;
use crate::start::check_for_multiple_start_nodes;
use crate::waiting::WaitingNode;

/// Lifecycle of a node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
  Pending,
  Ready,
  Running,
  Done,
  Ignored,
}

impl NodeState {
  pub fn is_terminal(self) -> bool {
    matches!(self, NodeState::Done | NodeState::Ignored)
  }
}

#[derive(Debug)]
pub struct RunContext {
  flow: Flow,
  graph: Graph,
  waiting: HashMap<String, WaitingNode>,
  states: HashMap<String, NodeState>,
  ignored: BTreeSet<String>,
  invoked: HashSet<String>,
  starting: Vec<String>,
}

impl RunContext {
  /// Validate the starting nodes and build the waiting table for every node
  /// of `flow`.
  ///
  /// `is_recursive` marks an iteration body, which may have several starts.
  pub fn new(flow: Flow, is_recursive: bool) -> Result<Self, RuntimeError> {
    let graph = flow.graph();
    let starting = check_for_multiple_start_nodes(graph.entry_points(), is_recursive, &flow)?;
    let waiting: HashMap<String, WaitingNode> = flow
      .nodes
      .keys()
      .map(|id| (id.clone(), WaitingNode::setup(id, &graph)))
      .collect();
    let states = flow
      .nodes
      .keys()
      .map(|id| (id.clone(), NodeState::Pending))
      .collect();

    Ok(Self {
      flow,
      graph,
      waiting,
      states,
      ignored: BTreeSet::new(),
      invoked: HashSet::new(),
      starting,
    })
  }

  pub fn flow(&self) -> &Flow {
    &self.flow
  }

  /// Starting nodes that passed validation.
  pub fn starting_nodes(&self) -> &[String] {
    &self.starting
  }

  pub fn state(&self, node_id: &str) -> Option<NodeState> {
    self.states.get(node_id).copied()
  }

  pub fn waiting_node(&self, node_id: &str) -> Option<&WaitingNode> {
    self.waiting.get(node_id)
  }

  /// Nodes excluded from this run because their branch was not taken.
  pub fn ignored(&self) -> &BTreeSet<String> {
    &self.ignored
  }

  /// Pending nodes, sorted.
  pub fn pending(&self) -> Vec<String> {
    self.sorted_in_state(NodeState::Pending)
  }

  /// Move every pending node whose inputs are satisfied to `Ready`.
  ///
  /// Returns the newly ready ids, sorted.
  pub fn ready_nodes(&mut self) -> Vec<String> {
    let ready: Vec<String> = self
      .sorted_in_state(NodeState::Pending)
      .into_iter()
      .filter(|id| self.waiting.get(id).is_some_and(WaitingNode::is_ready))
      .collect();

    for id in &ready {
      self.states.insert(id.clone(), NodeState::Ready);
    }
    ready
  }

  /// Mark a ready node as running and build its input.
  pub fn begin(&mut self, node_id: &str) -> Result<Option<NodeInput>, RuntimeError> {
    if !self.invoked.insert(node_id.to_string()) {
      return Err(RuntimeError::AlreadyInvoked {
        node_id: node_id.to_string(),
      });
    }
    match self.states.get_mut(node_id) {
      Some(state @ NodeState::Ready) => *state = NodeState::Running,
      _ => {
        return Err(RuntimeError::InvalidGraph {
          message: format!("node '{}' is not ready to run", node_id),
        });
      }
    }

    Ok(
      self
        .waiting
        .get(node_id)
        .and_then(|waiting| combine(&waiting.received_inputs)),
    )
  }

  /// Record a finished node.
  ///
  /// Prunes the branches a decision node did not select, propagates the
  /// pruning to nodes that can no longer become ready, and delivers the
  /// output to every remaining dependent. Returns the ids newly ignored.
  pub fn complete(
    &mut self,
    node_id: &str,
    output: &NodeOutput,
  ) -> Result<Vec<String>, RuntimeError> {
    match self.states.get_mut(node_id) {
      Some(state @ NodeState::Running) => *state = NodeState::Done,
      _ => {
        return Err(RuntimeError::InvalidGraph {
          message: format!("node '{}' completed without running", node_id),
        });
      }
    }

    let pruned = match self.flow.get_node(node_id) {
      Some(node) => prune_targets(node, output, &self.graph),
      None => BTreeSet::new(),
    };
    let newly_ignored = self.ignore(pruned);

    let dependents: Vec<String> = self.graph.downstream(node_id).to_vec();
    for dependent in dependents {
      if self.state(&dependent) != Some(NodeState::Pending) {
        continue;
      }
      if let Some(waiting) = self.waiting.get_mut(&dependent) {
        waiting.receive(node_id, NodeInput::Output(output.clone()));
      }
    }

    Ok(newly_ignored)
  }

  /// Mark pending nodes as ignored, then everything downstream that can no
  /// longer become ready. Returns every id newly ignored, in visit order.
  pub fn ignore(&mut self, node_ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut newly_ignored = Vec::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for id in node_ids {
      if self.mark_ignored(&id) {
        newly_ignored.push(id.clone());
        queue.push_back(id);
      }
    }

    while let Some(current) = queue.pop_front() {
      let dependents: Vec<String> = self.graph.downstream(&current).to_vec();
      for dependent in dependents {
        if self.state(&dependent) != Some(NodeState::Pending) {
          continue;
        }
        let blocked = self
          .waiting
          .get(&dependent)
          .is_some_and(|w| w.is_blocked_by(&self.ignored));
        if blocked && self.mark_ignored(&dependent) {
          newly_ignored.push(dependent.clone());
          queue.push_back(dependent);
        }
      }
    }

    newly_ignored
  }

  fn mark_ignored(&mut self, node_id: &str) -> bool {
    match self.states.get_mut(node_id) {
      Some(state @ NodeState::Pending) => {
        *state = NodeState::Ignored;
        self.ignored.insert(node_id.to_string());
        true
      }
      _ => false,
    }
  }

  fn sorted_in_state(&self, wanted: NodeState) -> Vec<String> {
    let mut ids: Vec<String> = self
      .states
      .iter()
      .filter(|(_, state)| **state == wanted)
      .map(|(id, _)| id.clone())
      .collect();
    ids.sort();
    ids
  }
}
