//! Agentflow Graph
//!
//! This crate provides the validated flow representation for agentflow.
//! A [`Flow`] is built from a [`agentflow_config::FlowDef`] once its node ids
//! are known to be unique and every edge references a known node.
//!
//! Key differences from `agentflow-config`:
//! - Nodes are keyed by id
//! - Incoming edges are indexed per target and ordered by output slot
//! - Join requirements of every node can be derived with
//!   [`analyze_dependencies`], separating hard (AND) predecessors from those
//!   gated by a decision ancestor (OR within a group)

mod dependency;
mod error;
mod flow;
mod graph;

pub use agentflow_config::{EdgeDef, Extent, FlowDef, NodeDef, NodeKind};
pub use dependency::{Dependencies, analyze_dependencies, find_decision_ancestor};
pub use error::GraphError;
pub use flow::Flow;
pub use graph::{Graph, incoming_edges};
