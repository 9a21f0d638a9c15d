use agentflow_config::parse_form_string;
use agentflow_runtime::{NodeContext, NodeError, NodeExecutor, NodeInput, NodeOutput};
use async_trait::async_trait;

/// Entry node of a flow.
///
/// Emits `{"input": <payload>, "state": {...}}`, where `state` is parsed from
/// the `key: value` lines in `config.state`.
#[derive(Debug, Clone, Default)]
pub struct StartNode;

#[async_trait]
impl NodeExecutor for StartNode {
  async fn execute(
    &self,
    ctx: NodeContext,
    _input: Option<NodeInput>,
  ) -> Result<NodeOutput, NodeError> {
    let state = match ctx.node.config.get("state") {
      None | Some(serde_json::Value::Null) => Default::default(),
      Some(serde_json::Value::String(form)) => parse_form_string(form),
      Some(other) => {
        return Err(NodeError::InvalidConfig(format!(
          "start node '{}': state must be a string, got {}",
          ctx.node.id, other
        )));
      }
    };

    let mut json = serde_json::Map::new();
    json.insert("input".to_string(), ctx.payload);
    json.insert(
      "state".to_string(),
      serde_json::Value::Object(
        state
          .into_iter()
          .map(|(k, v)| (k, serde_json::Value::String(v)))
          .collect(),
      ),
    );

    Ok(NodeOutput::from_json(json))
  }
}
