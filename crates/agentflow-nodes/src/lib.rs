//! Agentflow Nodes
//!
//! Built-in [`NodeExecutor`] implementations that let a flow run without any
//! model or tool integrations:
//!
//! - [`StartNode`]: emits the run payload together with the node's initial state
//! - [`PassthroughNode`]: forwards its input (used for agent, llm, tool and
//!   generic nodes)
//! - [`ConditionNode`]: picks a branch by evaluating expressions against the input
//! - [`HumanInputNode`]: picks proceed/reject from the human response in the payload
//!
//! Iteration nodes need no executor; the runtime drives them itself.

mod condition;
mod human_input;
mod passthrough;
mod start;

use std::sync::Arc;

use agentflow_config::NodeKind;
use agentflow_runtime::{ExecutorRegistry, NodeExecutor};

pub use condition::ConditionNode;
pub use human_input::HumanInputNode;
pub use passthrough::PassthroughNode;
pub use start::StartNode;

/// Register the built-in executor for every executable node kind.
pub fn register_builtin(registry: &mut ExecutorRegistry) {
  let passthrough: Arc<dyn NodeExecutor> = Arc::new(PassthroughNode);

  registry.register(NodeKind::Start, Arc::new(StartNode));
  registry.register(NodeKind::Generic, passthrough.clone());
  registry.register(NodeKind::Agent, passthrough.clone());
  registry.register(NodeKind::Llm, passthrough.clone());
  registry.register(NodeKind::Tool, passthrough);
  registry.register(NodeKind::Condition, Arc::new(ConditionNode));
  registry.register(NodeKind::ConditionAgent, Arc::new(ConditionNode));
  registry.register(NodeKind::HumanInput, Arc::new(HumanInputNode));
}

/// A registry holding only the built-in executors.
pub fn builtin_registry() -> ExecutorRegistry {
  let mut registry = ExecutorRegistry::new();
  register_builtin(&mut registry);
  registry
}
