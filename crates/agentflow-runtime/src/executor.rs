//! Node execution capability.
//!
//! Every node kind that a flow uses needs a [`NodeExecutor`] registered in the
//! [`ExecutorRegistry`]. Dispatch is by [`NodeKind`], never by node name.
//! Iteration nodes are the exception: they are run by the runtime itself.

use std::collections::HashMap;
use std::sync::Arc;

use agentflow_graph::{NodeDef, NodeKind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;
use crate::output::{NodeInput, NodeOutput};

/// Everything an executor gets to know about the invocation.
#[derive(Debug, Clone)]
pub struct NodeContext {
  pub execution_id: String,
  pub flow_id: String,
  pub node: NodeDef,
  /// Payload the run (or iteration) was started with.
  pub payload: serde_json::Value,
  /// Cancelled when the session is aborted. Long calls should observe it.
  pub cancel: CancellationToken,
}

#[async_trait]
pub trait NodeExecutor: Send + Sync {
  /// Run the node against its combined input.
  ///
  /// Decision executors must set `conditions` on the returned output, one
  /// entry per output slot.
  async fn execute(
    &self,
    ctx: NodeContext,
    input: Option<NodeInput>,
  ) -> Result<NodeOutput, NodeError>;

  /// Whether outputs may be served from the flow's cache.
  fn cacheable(&self) -> bool {
    false
  }
}

/// Executors keyed by node kind.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
  executors: HashMap<NodeKind, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register (or replace) the executor for a kind.
  pub fn register(&mut self, kind: NodeKind, executor: Arc<dyn NodeExecutor>) {
    self.executors.insert(kind, executor);
  }

  /// Builder-style [`register`](Self::register).
  pub fn with(mut self, kind: NodeKind, executor: Arc<dyn NodeExecutor>) -> Self {
    self.register(kind, executor);
    self
  }

  pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeExecutor>> {
    self.executors.get(&kind).cloned()
  }

  pub fn contains(&self, kind: NodeKind) -> bool {
    self.executors.contains_key(&kind)
  }
}

impl std::fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut kinds: Vec<&NodeKind> = self.executors.keys().collect();
    kinds.sort();
    f.debug_struct("ExecutorRegistry")
      .field("kinds", &kinds)
      .finish()
  }
}
