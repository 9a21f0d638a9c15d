//! Agentflow Runtime
//!
//! This crate provides the flow runtime for agentflow. It turns a validated
//! [`agentflow_graph::Flow`] plus asynchronously arriving node outputs into an
//! ordered, pruned, exactly-once sequence of node invocations.
//!
//! The pieces, leaves first:
//! - [`combine`] merges the outputs a node has received into one input
//! - [`WaitingNode`] tracks what a node has received and decides readiness
//! - [`prune_targets`] computes the branches a decision node did not take
//! - [`RunContext`] owns all per-run scheduling state
//! - [`Runtime`] drives the loop and dispatches nodes to their
//!   [`NodeExecutor`]
//!
//! Cancellation is per session through the [`AbortRegistry`]; node outputs may
//! be memoized through a [`CacheProvider`].

mod abort;
mod cache;
mod combine;
mod context;
mod error;
mod events;
mod executor;
mod output;
mod prune;
mod result;
mod runtime;
mod start;
mod waiting;

pub use abort::{AbortRegistry, session_key};
pub use cache::{CacheProvider, InMemoryCache};
pub use combine::combine;
pub use context::{NodeState, RunContext};
pub use error::{NodeError, RuntimeError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{ExecutorRegistry, NodeContext, NodeExecutor};
pub use output::{ConditionOutcome, NodeInput, NodeOutput};
pub use prune::prune_targets;
pub use result::{InvokeResult, NodeResult};
pub use runtime::{Runtime, RuntimeConfig};
pub use start::check_for_multiple_start_nodes;
pub use waiting::WaitingNode;
