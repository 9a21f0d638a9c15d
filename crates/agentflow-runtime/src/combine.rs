//! Merging of received predecessor outputs into a single node input.
//!
//! Entries are combined in predecessor-id order so the result does not depend
//! on which branch finished first:
//!
//! - no entries: no input
//! - one entry: that entry, unchanged
//! - several: a combined [`NodeOutput`] whose `json`/`binary` are keyed by
//!   predecessor id, whose `text` joins every text with a newline, and which
//!   carries the first error found. A text-only entry next to json entries is
//!   keyed into the json map as a string.

use std::collections::BTreeMap;

use crate::output::{NodeInput, NodeOutput};

/// Combine the inputs a node has received so far.
pub fn combine(received: &BTreeMap<String, NodeInput>) -> Option<NodeInput> {
  let entries: Vec<(&String, &NodeInput)> = received
    .iter()
    .filter(|(_, input)| !input.is_null())
    .collect();

  match entries.as_slice() {
    [] => return None,
    [(_, single)] => return Some((*single).clone()),
    _ => {}
  }

  let mut combined = NodeOutput::default();

  let binary: BTreeMap<String, serde_json::Value> = entries
    .iter()
    .filter_map(|(id, input)| {
      let binary = input.as_output()?.binary.as_ref()?;
      let payload = serde_json::to_value(binary).ok()?;
      Some(((*id).clone(), payload))
    })
    .collect();
  if !binary.is_empty() {
    combined.binary = Some(binary);
  }

  let texts: Vec<&str> = entries
    .iter()
    .filter_map(|(_, input)| input.as_output()?.text.as_deref())
    .collect();
  let joined_text = texts.join("\n");
  if texts.len() >= 2 {
    combined.text = Some(joined_text.clone());
  }

  let carries_json = entries
    .iter()
    .any(|(_, input)| input.as_output().is_some_and(|o| o.json.is_some()));
  if carries_json {
    let json: serde_json::Map<String, serde_json::Value> = entries
      .iter()
      .filter_map(|(id, input)| {
        let value = match input {
          NodeInput::Output(output) => match (&output.json, &output.text) {
            (Some(json), _) => serde_json::Value::Object(json.clone()),
            (None, Some(text)) => serde_json::Value::String(text.clone()),
            (None, None) => return None,
          },
          NodeInput::Value(value) => value.clone(),
        };
        Some(((*id).clone(), value))
      })
      .collect();
    combined.json = Some(json);
  } else if !texts.is_empty() {
    let mut json = serde_json::Map::new();
    json.insert("text".to_string(), serde_json::Value::String(joined_text));
    combined.json = Some(json);
  }

  combined.error = entries
    .iter()
    .find_map(|(_, input)| input.as_output()?.error.clone());

  Some(NodeInput::Output(combined))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn json_output(value: serde_json::Value) -> NodeInput {
    NodeInput::Output(NodeOutput::from_json(value.as_object().cloned().unwrap()))
  }

  fn text_output(text: &str) -> NodeInput {
    NodeInput::Output(NodeOutput::from_text(text))
  }

  fn received(entries: Vec<(&str, NodeInput)>) -> BTreeMap<String, NodeInput> {
    entries
      .into_iter()
      .map(|(id, input)| (id.to_string(), input))
      .collect()
  }

  fn combined_output(received: &BTreeMap<String, NodeInput>) -> NodeOutput {
    match combine(received) {
      Some(NodeInput::Output(output)) => output,
      other => panic!("expected combined output, got {:?}", other),
    }
  }

  #[test]
  fn test_empty_is_none() {
    assert_eq!(combine(&BTreeMap::new()), None);
  }

  #[test]
  fn test_single_entry_unchanged() {
    let single = text_output("only");
    assert_eq!(combine(&received(vec![("a", single.clone())])), Some(single));

    let primitive = NodeInput::Value(json!(42));
    assert_eq!(
      combine(&received(vec![("a", primitive.clone())])),
      Some(primitive)
    );
  }

  #[test]
  fn test_null_entries_ignored() {
    let single = json_output(json!({ "v": 1 }));
    let result = combine(&received(vec![
      ("a", single.clone()),
      ("b", NodeInput::Value(serde_json::Value::Null)),
    ]));
    assert_eq!(result, Some(single));
  }

  #[test]
  fn test_json_keyed_by_predecessor() {
    // inserted out of order on purpose
    let output = combined_output(&received(vec![
      ("b", json_output(json!({ "v": 2 }))),
      ("a", json_output(json!({ "v": 1 }))),
    ]));

    assert_eq!(
      serde_json::Value::Object(output.json.unwrap()),
      json!({ "a": { "v": 1 }, "b": { "v": 2 } })
    );
    assert_eq!(output.text, None);
    assert_eq!(output.error, None);
  }

  #[test]
  fn test_text_joined_and_synthesized_json() {
    let output = combined_output(&received(vec![
      ("b", text_output("World")),
      ("a", text_output("Hello")),
    ]));

    assert_eq!(output.text.as_deref(), Some("Hello\nWorld"));
    assert_eq!(
      serde_json::Value::Object(output.json.unwrap()),
      json!({ "text": "Hello\nWorld" })
    );
  }

  #[test]
  fn test_single_text_among_many_not_joined() {
    let output = combined_output(&received(vec![
      ("a", text_output("Hello")),
      ("b", NodeInput::Value(json!(7))),
    ]));

    assert_eq!(output.text, None);
    assert_eq!(
      serde_json::Value::Object(output.json.unwrap()),
      json!({ "text": "Hello" })
    );
  }

  #[test]
  fn test_primitive_included_in_json_map() {
    let output = combined_output(&received(vec![
      ("a", json_output(json!({ "v": 1 }))),
      ("b", NodeInput::Value(json!("raw"))),
    ]));

    assert_eq!(
      serde_json::Value::Object(output.json.unwrap()),
      json!({ "a": { "v": 1 }, "b": "raw" })
    );
  }

  #[test]
  fn test_text_only_entry_keyed_into_json_map() {
    let output = combined_output(&received(vec![
      ("a", json_output(json!({ "v": 1 }))),
      ("b", text_output("summary")),
      ("c", NodeInput::Output(NodeOutput::from_error("failed"))),
    ]));

    assert_eq!(
      serde_json::Value::Object(output.json.unwrap()),
      json!({ "a": { "v": 1 }, "b": "summary" })
    );
    assert_eq!(output.text, None);
    assert_eq!(output.error.as_deref(), Some("failed"));
  }

  #[test]
  fn test_binary_keyed_by_predecessor() {
    let mut with_binary = NodeOutput::from_text("image");
    with_binary.binary = Some(BTreeMap::from([(
      "photo.png".to_string(),
      json!("base64data"),
    )]));

    let output = combined_output(&received(vec![
      ("a", NodeInput::Output(with_binary)),
      ("b", text_output("caption")),
    ]));

    let binary = output.binary.unwrap();
    assert_eq!(binary.len(), 1);
    assert_eq!(binary["a"], json!({ "photo.png": "base64data" }));
  }

  #[test]
  fn test_first_error_wins() {
    let output = combined_output(&received(vec![
      ("c", NodeInput::Output(NodeOutput::from_error("third"))),
      ("b", NodeInput::Output(NodeOutput::from_error("second"))),
      ("a", text_output("fine")),
    ]));

    assert_eq!(output.error.as_deref(), Some("second"));
  }
}
