//! Parsing for `key: value` line lists used in node configuration.

use std::collections::BTreeMap;

/// Parse newline-separated `key: value` pairs.
///
/// Lines are split at the first colon only, so values such as `10:30:00`
/// survive intact. Lines without a colon, or with an empty key or value after
/// trimming, are skipped.
pub fn parse_form_string(text: &str) -> BTreeMap<String, String> {
  text
    .lines()
    .filter_map(|line| {
      let (key, value) = line.split_once(':')?;
      let (key, value) = (key.trim(), value.trim());
      if key.is_empty() || value.is_empty() {
        return None;
      }
      Some((key.to_string(), value.to_string()))
    })
    .collect()
}
