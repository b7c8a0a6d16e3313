//! Partial section salvage: parse each module section on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::direct_parse;
use super::repair::positional_repair;
use crate::domain::ModuleKind;

static MODULE_KEY: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#""(reading|listening|writing|speaking)"\s*:\s*\{"#).expect("module key regex")
});

/// Upper bound on how far a single section may extend.
const MAX_FRAGMENT_BYTES: usize = 256 * 1024;

/// Assemble a document from whichever module sections parse in isolation.
pub fn salvage_sections(text: &str) -> Option<Value> {
  let mut doc = Map::new();

  for kind in ModuleKind::ALL {
    let key = kind.key();
    let Some(body_start) = MODULE_KEY
      .captures_iter(text)
      .find(|c| c.get(1).map(|m| m.as_str()) == Some(key))
      .and_then(|c| c.get(0))
      .map(|m| m.end() - 1)
    else {
      continue;
    };

    let (fragment, closed) = section_body(text, body_start);
    let wrapped = if closed {
      format!("{{\"{key}\": {fragment}}}")
    } else {
      // Leave it open so positional repair appends the right closers.
      format!("{{\"{key}\": {fragment}")
    };

    let parsed = direct_parse(&wrapped).or_else(|| positional_repair(&wrapped));
    if let Some(body) = parsed.and_then(|mut v| v.as_object_mut().and_then(|m| m.remove(key))) {
      doc.insert(key.to_string(), body);
    }
  }

  (!doc.is_empty()).then_some(Value::Object(doc))
}

/// Balanced `{...}` starting at `start`, bounded. `false` when it never closes.
fn section_body(text: &str, start: usize) -> (&str, bool) {
  let limit = (start + MAX_FRAGMENT_BYTES).min(text.len());
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (i, c) in text[start..].char_indices() {
    let at = start + i;
    if at >= limit {
      break;
    }
    if in_string {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }
    match c {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth = depth.saturating_sub(1);
        if depth == 0 {
          return (&text[start..=at], true);
        }
      }
      _ => {}
    }
  }

  let mut end = limit;
  while !text.is_char_boundary(end) {
    end -= 1;
  }
  (&text[start..end], false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn keeps_sections_that_parse_and_drops_the_rest() {
    let text = r#"{"reading": {"passages": [{"questions": []}]}, "listening": {"sections": [ oops !!! }, "writing": {"tasks": [{"instructions": "Write"}]}"#;
    let v = salvage_sections(text).expect("salvaged");
    assert_eq!(v["reading"], json!({"passages": [{"questions": []}]}));
    assert_eq!(v["writing"], json!({"tasks": [{"instructions": "Write"}]}));
    assert!(v.get("speaking").is_none());
  }

  #[test]
  fn truncated_final_section_is_closed() {
    let text = r#"{"speaking": {"parts": [{"questions": ["Where do you live?""#;
    let v = salvage_sections(text).expect("salvaged");
    assert_eq!(v["speaking"]["parts"][0]["questions"][0], json!("Where do you live?"));
  }

  #[test]
  fn nothing_to_salvage() {
    assert!(salvage_sections("{\"title\": broken").is_none());
  }
}
