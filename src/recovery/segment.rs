//! Block segmentation: split text into top-level balanced `{...}` spans.

use serde_json::Value;

use super::direct_parse;
use super::repair::positional_repair;

/// Every top-level balanced object span, in order of appearance.
/// Quotes are only tracked inside braces so prose apostrophes do not matter.
pub fn top_level_blocks(text: &str) -> Vec<&str> {
  let mut blocks = Vec::new();
  let mut depth = 0usize;
  let mut start = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (i, c) in text.char_indices() {
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
      '"' if depth > 0 => in_string = true,
      '{' => {
        if depth == 0 {
          start = i;
        }
        depth += 1;
      }
      '}' if depth > 0 => {
        depth -= 1;
        if depth == 0 {
          blocks.push(&text[start..=i]);
        }
      }
      _ => {}
    }
  }
  blocks
}

/// Direct parse on each block first, then positional repair on each.
pub fn recover_blocks(text: &str) -> Option<Value> {
  let blocks = top_level_blocks(text);
  blocks
    .iter()
    .find_map(|b| direct_parse(b))
    .or_else(|| blocks.iter().find_map(|b| positional_repair(b)))
}
