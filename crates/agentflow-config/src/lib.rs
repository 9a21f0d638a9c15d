//! Agentflow Config
//!
//! This crate contains the serializable flow configuration types for agentflow.
//! These types represent flow definitions as they are authored in the visual
//! builder, before they are validated into a runnable graph.
//!
//! Configuration can be loaded from:
//! - JSON files (via the CLI)
//! - Flow storage (as JSON blobs)
//!
//! Node configuration is opaque here; only the executor registered for a node's
//! kind interprets it. The [`parse_form_string`] helper is shared by executors
//! that accept `key: value` line lists in their configuration.

mod edge;
mod flow;
mod form;
mod node;

pub use edge::EdgeDef;
pub use flow::FlowDef;
pub use form::parse_form_string;
pub use node::{Extent, NodeDef, NodeKind};
