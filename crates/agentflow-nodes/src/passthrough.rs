use agentflow_runtime::{NodeContext, NodeError, NodeExecutor, NodeInput, NodeOutput};
use async_trait::async_trait;
use tracing::debug;

/// Forwards its input unchanged, or the run payload when it has no input.
///
/// Stands in for agent, llm, tool and generic nodes when no model or tool
/// integration is configured.
#[derive(Debug, Clone, Default)]
pub struct PassthroughNode;

#[async_trait]
impl NodeExecutor for PassthroughNode {
  async fn execute(
    &self,
    ctx: NodeContext,
    input: Option<NodeInput>,
  ) -> Result<NodeOutput, NodeError> {
    debug!(node_id = %ctx.node.id, has_input = input.is_some(), "passthrough");

    let output = match input {
      Some(NodeInput::Output(output)) => NodeOutput {
        conditions: None,
        ..output
      },
      Some(NodeInput::Value(value)) => output_from_value(value),
      None => output_from_value(ctx.payload),
    };
    Ok(output)
  }
}

fn output_from_value(value: serde_json::Value) -> NodeOutput {
  match value {
    serde_json::Value::Object(json) => NodeOutput::from_json(json),
    serde_json::Value::String(text) => NodeOutput::from_text(text),
    serde_json::Value::Null => NodeOutput::default(),
    other => {
      let mut json = serde_json::Map::new();
      json.insert("value".to_string(), other);
      NodeOutput::from_json(json)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{Extent, NodeDef, NodeKind};
  use serde_json::json;
  use tokio_util::sync::CancellationToken;

  fn context(payload: serde_json::Value) -> NodeContext {
    NodeContext {
      execution_id: "exec-1".to_string(),
      flow_id: "flow-1".to_string(),
      node: NodeDef {
        id: "agent".to_string(),
        kind: NodeKind::Agent,
        extent: Extent::TopLevel,
        parent_node: None,
        config: serde_json::Value::Null,
        timeout_ms: None,
      },
      payload,
      cancel: CancellationToken::new(),
    }
  }

  #[tokio::test]
  async fn test_forwards_output_without_conditions() {
    let upstream = NodeOutput::from_text("go").with_conditions([true, false]);

    let output = PassthroughNode
      .execute(context(json!({})), Some(NodeInput::Output(upstream)))
      .await
      .unwrap();

    assert_eq!(output.text.as_deref(), Some("go"));
    assert!(output.conditions.is_none());
  }

  #[tokio::test]
  async fn test_uses_payload_without_input() {
    let output = PassthroughNode
      .execute(context(json!({ "question": "hi" })), None)
      .await
      .unwrap();

    assert_eq!(output.value(), json!({ "question": "hi" }));
  }

  #[tokio::test]
  async fn test_wraps_primitive_values() {
    let output = PassthroughNode
      .execute(context(json!({})), Some(NodeInput::Value(json!(7))))
      .await
      .unwrap();

    assert_eq!(output.value(), json!({ "value": 7 }));
  }
}
