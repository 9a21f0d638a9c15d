use serde::{Deserialize, Serialize};

/// A directed edge between two nodes.
///
/// Handles follow the builder's `"<node id>-output-<slot>"` convention. For
/// decision nodes the trailing slot index selects the branch the edge belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub id: String,
  pub source: String,
  #[serde(default)]
  pub source_handle: String,
  pub target: String,
  #[serde(default)]
  pub target_handle: String,
}

impl EdgeDef {
  /// Branch index encoded at the end of the source handle, if it parses.
  pub fn source_output_slot(&self) -> Option<usize> {
    self
      .source_handle
      .rsplit('-')
      .next()
      .and_then(|slot| slot.parse().ok())
  }
}
