use agentflow_runtime::{NodeContext, NodeError, NodeExecutor, NodeInput, NodeOutput};
use async_trait::async_trait;
use tracing::{info, warn};

/// Output slot taken when the human approves.
const PROCEED: usize = 0;
/// Output slot taken when the human rejects.
const REJECT: usize = 1;

/// Routes on a human decision carried in the run payload.
///
/// Reads `payload.human_input = { "type": "proceed" | "reject", "feedback"? }`.
/// Without a response both branches stay unfulfilled and the output carries an
/// error, so nothing downstream runs.
#[derive(Debug, Clone, Default)]
pub struct HumanInputNode;

#[async_trait]
impl NodeExecutor for HumanInputNode {
  async fn execute(
    &self,
    ctx: NodeContext,
    input: Option<NodeInput>,
  ) -> Result<NodeOutput, NodeError> {
    let response = ctx.payload.get("human_input");
    let decision = response
      .and_then(|r| r.get("type"))
      .and_then(|t| t.as_str());

    let slot = match decision {
      Some("proceed") => PROCEED,
      Some("reject") => REJECT,
      Some(other) => {
        return Err(NodeError::InvalidConfig(format!(
          "human input '{}': unknown response type '{}'",
          ctx.node.id, other
        )));
      }
      None => {
        warn!(node_id = %ctx.node.id, "no human response in payload");
        return Ok(
          NodeOutput::from_error(format!("human input '{}' is awaiting a response", ctx.node.id))
            .with_conditions([false, false]),
        );
      }
    };
    info!(node_id = %ctx.node.id, decision = ?decision, "human response received");

    let mut json = serde_json::Map::new();
    json.insert(
      "input".to_string(),
      input.map(|i| i.value()).unwrap_or(serde_json::Value::Null),
    );
    if let Some(feedback) = response.and_then(|r| r.get("feedback")) {
      json.insert("feedback".to_string(), feedback.clone());
    }

    Ok(NodeOutput::from_json(json).with_conditions([slot == PROCEED, slot == REJECT]))
  }
}
