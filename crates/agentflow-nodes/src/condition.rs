//! Expression-driven branch selection.
//!
//! `config.conditions` lists minijinja expressions, one per output slot. They
//! are evaluated in order against `{ input, payload }` and the first truthy one
//! selects its slot. One extra trailing slot is the else branch, fulfilled only
//! when no expression matched.
//!
//! ```json
//! { "conditions": ["input.score >= 8", "input.score >= 5"] }
//! ```

use agentflow_runtime::{NodeContext, NodeError, NodeExecutor, NodeInput, NodeOutput};
use async_trait::async_trait;
use minijinja::{Environment, Value};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ConditionNode;

#[async_trait]
impl NodeExecutor for ConditionNode {
  async fn execute(
    &self,
    ctx: NodeContext,
    input: Option<NodeInput>,
  ) -> Result<NodeOutput, NodeError> {
    let expressions = expressions(&ctx)?;
    let input_value = input
      .as_ref()
      .map(NodeInput::value)
      .unwrap_or(serde_json::Value::Null);

    let scope = Value::from_serialize(serde_json::json!({
      "input": input_value,
      "payload": ctx.payload,
    }));
    let env = Environment::new();

    let mut matched = None;
    for (index, source) in expressions.iter().enumerate() {
      let expr = env.compile_expression(source).map_err(|e| {
        NodeError::InvalidConfig(format!(
          "condition '{}' expression {} ('{}'): {}",
          ctx.node.id, index, source, e
        ))
      })?;
      let result = expr.eval(&scope).map_err(|e| {
        NodeError::Failed(format!(
          "condition '{}' expression {} failed: {}",
          ctx.node.id, index, e
        ))
      })?;
      if result.is_true() {
        matched = Some(index);
        break;
      }
    }

    // trailing slot is the else branch
    let selected = matched.unwrap_or(expressions.len());
    debug!(node_id = %ctx.node.id, selected, "condition evaluated");

    let output = match input {
      Some(NodeInput::Output(output)) => NodeOutput {
        conditions: None,
        ..output
      },
      Some(NodeInput::Value(value)) => NodeOutput::from_text(value.to_string()),
      None => NodeOutput::default(),
    };
    Ok(output.with_conditions((0..=expressions.len()).map(|slot| slot == selected)))
  }
}

fn expressions(ctx: &NodeContext) -> Result<Vec<String>, NodeError> {
  let Some(conditions) = ctx.node.config.get("conditions") else {
    return Ok(Vec::new());
  };

  conditions
    .as_array()
    .ok_or_else(|| {
      NodeError::InvalidConfig(format!(
        "condition '{}': conditions must be an array",
        ctx.node.id
      ))
    })?
    .iter()
    .map(|c| {
      c.as_str().map(str::to_string).ok_or_else(|| {
        NodeError::InvalidConfig(format!(
          "condition '{}': every condition must be a string",
          ctx.node.id
        ))
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{Extent, NodeDef, NodeKind};
  use serde_json::json;
  use tokio_util::sync::CancellationToken;

  fn context(config: serde_json::Value) -> NodeContext {
    NodeContext {
      execution_id: "exec-1".to_string(),
      flow_id: "flow-1".to_string(),
      node: NodeDef {
        id: "condition1".to_string(),
        kind: NodeKind::Condition,
        extent: Extent::TopLevel,
        parent_node: None,
        config,
        timeout_ms: None,
      },
      payload: json!({ "mode": "strict" }),
      cancel: CancellationToken::new(),
    }
  }

  fn json_input(value: serde_json::Value) -> Option<NodeInput> {
    Some(NodeInput::Output(NodeOutput::from_json(
      value.as_object().cloned().unwrap(),
    )))
  }

  fn fulfilled(output: &NodeOutput) -> Vec<bool> {
    output
      .conditions
      .as_ref()
      .unwrap()
      .iter()
      .map(|c| c.is_fulfilled)
      .collect()
  }

  #[tokio::test]
  async fn test_first_matching_expression_wins() {
    let ctx = context(json!({ "conditions": ["input.score >= 8", "input.score >= 5"] }));

    let output = ConditionNode
      .execute(ctx, json_input(json!({ "score": 9 })))
      .await
      .unwrap();

    assert_eq!(fulfilled(&output), vec![true, false, false]);
    assert_eq!(output.value(), json!({ "score": 9 }));
  }

  #[tokio::test]
  async fn test_else_branch_when_nothing_matches() {
    let ctx = context(json!({ "conditions": ["input.score >= 8", "input.score >= 5"] }));

    let output = ConditionNode
      .execute(ctx, json_input(json!({ "score": 2 })))
      .await
      .unwrap();

    assert_eq!(fulfilled(&output), vec![false, false, true]);
  }

  #[tokio::test]
  async fn test_expression_can_read_payload() {
    let ctx = context(json!({ "conditions": ["payload.mode == 'strict'"] }));

    let output = ConditionNode.execute(ctx, None).await.unwrap();

    assert_eq!(fulfilled(&output), vec![true, false]);
  }

  #[tokio::test]
  async fn test_invalid_expression() {
    let ctx = context(json!({ "conditions": ["input.score >="] }));

    let result = ConditionNode.execute(ctx, None).await;

    assert!(matches!(result, Err(NodeError::InvalidConfig(_))));
  }

  #[tokio::test]
  async fn test_conditions_must_be_strings() {
    let ctx = context(json!({ "conditions": [1] }));

    let result = ConditionNode.execute(ctx, None).await;

    assert!(matches!(result, Err(NodeError::InvalidConfig(_))));
  }
}
