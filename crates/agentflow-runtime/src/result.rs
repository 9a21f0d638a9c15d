//! Execution result types.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::output::{NodeInput, NodeOutput};

/// Result of a single node execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
  /// Unique task ID for this execution.
  pub task_id: String,
  /// Node ID that was executed.
  pub node_id: String,
  /// Combined input from upstream node(s).
  pub input: Option<NodeInput>,
  /// Node output.
  pub output: NodeOutput,
}

/// Result of a complete flow invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResult {
  /// Unique execution ID.
  pub execution_id: String,
  /// Results of all executed nodes, keyed by node_id.
  pub node_results: HashMap<String, NodeResult>,
  /// Nodes skipped because their branch was not selected.
  pub ignored: BTreeSet<String>,
}
