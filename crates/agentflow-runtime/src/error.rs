//! Runtime error types.

use agentflow_graph::NodeKind;

/// Errors that end a run.
///
/// Failures inside a single node are not among them: those become an
/// `error` on the node's [`crate::NodeOutput`] and flow to its dependents.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// More than one top-level node has no incoming edges.
  #[error("multiple starting nodes are not allowed: {node_ids:?}")]
  MultipleStartNodes { node_ids: Vec<String> },

  /// Nodes are still waiting but none of them can become ready.
  #[error("flow deadlocked with pending nodes: {pending:?}")]
  Deadlock { pending: Vec<String> },

  /// No executor is registered for a node's kind.
  #[error("no executor registered for node '{node_id}' of kind {kind:?}")]
  MissingExecutor { node_id: String, kind: NodeKind },

  /// A node was scheduled a second time within one run.
  #[error("node '{node_id}' was already invoked in this run")]
  AlreadyInvoked { node_id: String },

  /// A spawned node task panicked or was aborted.
  #[error("task join error for node '{node_id}': {message}")]
  TaskJoin { node_id: String, message: String },

  /// Invalid flow graph structure.
  #[error("invalid graph: {message}")]
  InvalidGraph { message: String },
}

/// Errors returned by a [`crate::NodeExecutor`].
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
  /// The node observed cancellation and stopped early.
  #[error("node execution cancelled")]
  Cancelled,

  /// The node's configuration could not be interpreted.
  #[error("invalid node configuration: {0}")]
  InvalidConfig(String),

  /// The node ran and failed.
  #[error("{0}")]
  Failed(String),
}
