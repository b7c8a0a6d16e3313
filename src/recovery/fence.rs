//! Working-text selection: fenced code block, else the outermost brace span.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("fence regex"));

/// Pick the slice of `raw` that most likely holds the JSON object.
pub fn working_text(raw: &str) -> &str {
  for cap in FENCE.captures_iter(raw) {
    if let Some(body) = cap.get(1) {
      let body = body.as_str().trim();
      if body.contains('{') {
        return body;
      }
    }
  }

  match (raw.find('{'), raw.rfind('}')) {
    (Some(start), Some(end)) if end > start => &raw[start..=end],
    // Truncated output: keep everything after the first brace.
    (Some(start), _) => &raw[start..],
    _ => raw.trim(),
  }
}
