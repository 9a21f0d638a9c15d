use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Extent::is_top_level")]
  pub extent: Extent,
  /// Enclosing iteration node, for nodes nested inside an iteration.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_node: Option<String>,
  #[serde(default)]
  pub config: serde_json::Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl NodeDef {
  /// True when the node lives inside an iteration body.
  pub fn is_nested(&self) -> bool {
    self.extent == Extent::Parent
  }
}

/// The closed set of node kinds a flow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  /// Entry node receiving the run payload.
  Start,
  Generic,
  Agent,
  Llm,
  Tool,
  /// Rule-based branch selection.
  Condition,
  /// Model-driven branch selection.
  ConditionAgent,
  /// Branch selection by a human reviewer.
  HumanInput,
  /// Runs its nested nodes once per input item.
  Iteration,
}

impl NodeKind {
  /// Decision nodes select which of their output branches are taken.
  pub fn is_decision(self) -> bool {
    matches!(
      self,
      NodeKind::Condition | NodeKind::ConditionAgent | NodeKind::HumanInput
    )
  }
}

/// Where a node sits relative to iteration bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extent {
  #[default]
  TopLevel,
  /// Nested inside an iteration node.
  Parent,
}

impl Extent {
  pub fn is_top_level(&self) -> bool {
    *self == Extent::TopLevel
  }
}
