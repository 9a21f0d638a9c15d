//! Values passed between nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output of a node invocation.
///
/// A single structural value: any combination of the fields may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub json: Option<serde_json::Map<String, serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
  /// Attachment name -> payload.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub binary: Option<BTreeMap<String, serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Per-branch outcome of a decision node, indexed by output slot.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conditions: Option<Vec<ConditionOutcome>>,
}

/// Whether a decision node selected one of its branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOutcome {
  pub is_fulfilled: bool,
}

impl NodeOutput {
  pub fn from_json(json: serde_json::Map<String, serde_json::Value>) -> Self {
    Self {
      json: Some(json),
      ..Self::default()
    }
  }

  pub fn from_text(text: impl Into<String>) -> Self {
    Self {
      text: Some(text.into()),
      ..Self::default()
    }
  }

  pub fn from_error(error: impl Into<String>) -> Self {
    Self {
      error: Some(error.into()),
      ..Self::default()
    }
  }

  /// Attach branch outcomes, one flag per output slot.
  pub fn with_conditions(mut self, fulfilled: impl IntoIterator<Item = bool>) -> Self {
    self.conditions = Some(
      fulfilled
        .into_iter()
        .map(|is_fulfilled| ConditionOutcome { is_fulfilled })
        .collect(),
    );
    self
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  /// The output as a plain JSON value: its `json`, else its `text`, else null.
  pub fn value(&self) -> serde_json::Value {
    match (&self.json, &self.text) {
      (Some(json), _) => serde_json::Value::Object(json.clone()),
      (None, Some(text)) => serde_json::Value::String(text.clone()),
      (None, None) => serde_json::Value::Null,
    }
  }
}

/// What a predecessor delivered to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeInput {
  /// A structured node output.
  Output(NodeOutput),
  /// A bare value, such as an iteration item.
  Value(serde_json::Value),
}

impl NodeInput {
  pub fn is_null(&self) -> bool {
    matches!(self, NodeInput::Value(serde_json::Value::Null))
  }

  pub fn as_output(&self) -> Option<&NodeOutput> {
    match self {
      NodeInput::Output(output) => Some(output),
      NodeInput::Value(_) => None,
    }
  }

  /// The input as a plain JSON value.
  pub fn value(&self) -> serde_json::Value {
    match self {
      NodeInput::Output(output) => output.value(),
      NodeInput::Value(value) => value.clone(),
    }
  }
}

impl From<NodeOutput> for NodeInput {
  fn from(output: NodeOutput) -> Self {
    NodeInput::Output(output)
  }
}
