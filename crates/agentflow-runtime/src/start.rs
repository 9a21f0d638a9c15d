use agentflow_graph::Flow;

use crate::error::RuntimeError;

/// Validate the starting nodes of a run.
///
/// Nested runs (iteration bodies) are unconstrained and get `starting_ids`
/// back unchanged. Otherwise nodes nested inside an iteration are filtered out
/// and more than one remaining id is an error. Unknown ids count as top-level.
pub fn check_for_multiple_start_nodes(
  starting_ids: &[String],
  is_recursive: bool,
  flow: &Flow,
) -> Result<Vec<String>, RuntimeError> {
  if is_recursive {
    return Ok(starting_ids.to_vec());
  }

  let top_level: Vec<String> = starting_ids
    .iter()
    .filter(|id| !flow.get_node(id).is_some_and(|node| node.is_nested()))
    .cloned()
    .collect();

  if top_level.len() > 1 {
    return Err(RuntimeError::MultipleStartNodes {
      node_ids: top_level,
    });
  }

  Ok(top_level)
}
