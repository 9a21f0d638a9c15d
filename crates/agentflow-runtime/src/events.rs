//! Execution events and notifiers for observability.
//!
//! Events are emitted during a run so consumers can observe progress, persist
//! state or forward it to a client.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::output::NodeOutput;

/// Events emitted during flow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  FlowStarted {
    execution_id: String,
    flow_id: String,
  },

  NodeStarted {
    execution_id: String,
    node_id: String,
  },

  NodeCompleted {
    execution_id: String,
    node_id: String,
    output: NodeOutput,
  },

  /// The node ran and its output carries an error.
  NodeFailed {
    execution_id: String,
    node_id: String,
    error: String,
  },

  /// The node lies on a branch that was not taken and will not run.
  NodeIgnored {
    execution_id: String,
    node_id: String,
  },

  FlowCompleted { execution_id: String },

  FlowFailed { execution_id: String, error: String },
}

/// Trait for receiving execution events.
///
/// The runtime calls `notify` for each event; implementations decide what to
/// do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the scheduling loop; volume is a
  // handful of events per node.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
