//! Positional repair: use the parser's failure position to patch the text.
//!
//! Each round looks at a small window around the reported offset and tries a
//! handful of single insertions (comma, quote, property-name quotes) plus
//! closing brackets when input ended early. A variant that parses wins; else
//! the variant that pushes the failure furthest forward seeds the next round.

use serde_json::error::Category;
use serde_json::Value;

const MAX_ROUNDS: usize = 24;

pub fn positional_repair(text: &str) -> Option<Value> {
  let mut current = text.to_string();
  let mut err = match serde_json::from_str::<Value>(&current) {
    Ok(v) => return v.is_object().then_some(v),
    Err(e) => e,
  };

  for _ in 0..MAX_ROUNDS {
    let offset = error_offset(&current, &err);
    let mut best: Option<(String, usize, serde_json::Error)> = None;

    for (variant, inserted) in candidates(&current, offset, err.classify()) {
      match serde_json::from_str::<Value>(&variant) {
        Ok(v) if v.is_object() => return Some(v),
        Ok(_) => continue,
        Err(e) => {
          let next = error_offset(&variant, &e);
          let progressed = next > offset + inserted;
          let better = best.as_ref().map_or(true, |(_, b, _)| next > *b);
          if progressed && better {
            best = Some((variant, next, e));
          }
        }
      }
    }

    let (next_text, _, next_err) = best?;
    current = next_text;
    err = next_err;
  }
  None
}

/// Byte offset of a serde_json failure (line/column are 1-based).
fn error_offset(text: &str, err: &serde_json::Error) -> usize {
  let line_start = if err.line() <= 1 {
    0
  } else {
    text
      .match_indices('\n')
      .nth(err.line() - 2)
      .map(|(i, _)| i + 1)
      .unwrap_or(text.len())
  };
  let mut offset = (line_start + err.column().saturating_sub(1)).min(text.len());
  while !text.is_char_boundary(offset) {
    offset -= 1;
  }
  offset
}

fn insert_at(text: &str, at: usize, s: &str) -> String {
  let mut out = String::with_capacity(text.len() + s.len());
  out.push_str(&text[..at]);
  out.push_str(s);
  out.push_str(&text[at..]);
  out
}

/// End of the previous non-whitespace character before `at`.
fn prev_significant_end(text: &str, at: usize) -> usize {
  text[..at].trim_end().len()
}

fn is_ident(c: char) -> bool {
  c.is_alphanumeric() || c == '_' || c == '-' || c == '$'
}

/// Span of an identifier touching `at`, if any.
fn ident_span(text: &str, at: usize) -> Option<(usize, usize)> {
  let start = text[..at]
    .char_indices()
    .rev()
    .take_while(|(_, c)| is_ident(*c))
    .last()
    .map(|(i, _)| i)
    .unwrap_or(at);
  let end = text[at..]
    .char_indices()
    .find(|(_, c)| !is_ident(*c))
    .map(|(i, _)| at + i)
    .unwrap_or(text.len());
  (end > start).then_some((start, end))
}

fn candidates(text: &str, offset: usize, category: Category) -> Vec<(String, usize)> {
  let mut out = Vec::new();

  if category == Category::Eof {
    if let Some(closed) = close_open_brackets(text) {
      let added = closed.len() - text.len();
      out.push((closed, added));
    }
    return out;
  }

  let prev_end = prev_significant_end(text, offset);

  // Missing property-name quotes around an identifier at the failure point.
  if let Some((start, end)) = ident_span(text, offset) {
    let quoted = format!("{}\"{}\"{}", &text[..start], &text[start..end], &text[end..]);
    out.push((quoted, 2));
    // Half-quoted name such as `name": 1`.
    if text[end..].starts_with('"') {
      out.push((insert_at(text, start, "\""), 1));
    }
  }

  // Missing opening quote here.
  out.push((insert_at(text, offset, "\""), 1));

  // Missing comma, at the failure point or right after the previous value.
  out.push((insert_at(text, offset, ","), 1));
  if prev_end != offset {
    out.push((insert_at(text, prev_end, ","), 1));
  }

  // Missing closing quote for the previous value.
  out.push((insert_at(text, prev_end, "\""), 1));

  out
}

/// Append whatever closes the open string/containers at end of input.
fn close_open_brackets(text: &str) -> Option<String> {
  let mut stack = Vec::new();
  let mut in_string = false;
  let mut escaped = false;

  for c in text.chars() {
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
      '{' => stack.push('}'),
      '[' => stack.push(']'),
      '}' | ']' => {
        stack.pop();
      }
      _ => {}
    }
  }

  if stack.is_empty() && !in_string {
    return None;
  }

  let mut out = text.trim_end().to_string();
  if in_string {
    if escaped {
      out.pop();
    }
    out.push('"');
  }
  if out.ends_with(',') {
    out.pop();
  }
  if out.ends_with(':') {
    out.push_str(" null");
  }
  while let Some(closer) = stack.pop() {
    out.push(closer);
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn inserts_missing_comma_between_members() {
    let v = positional_repair("{\"a\": \"x\"\n  \"b\": 2}").expect("repaired");
    assert_eq!(v, json!({"a": "x", "b": 2}));
  }

  #[test]
  fn quotes_a_half_quoted_property_name() {
    let v = positional_repair("{\"a\": 1, b\": 2}").expect("repaired");
    assert_eq!(v, json!({"a": 1, "b": 2}));
  }

  #[test]
  fn closes_containers_at_end_of_input() {
    let v = positional_repair("{\"a\": [1, 2, {\"b\": \"c").expect("repaired");
    assert_eq!(v, json!({"a": [1, 2, {"b": "c"}]}));
  }

  #[test]
  fn dangling_key_gets_null() {
    let v = positional_repair("{\"a\": 1, \"b\":").expect("repaired");
    assert_eq!(v, json!({"a": 1, "b": null}));
  }

  #[test]
  fn several_missing_commas_are_fixed_in_rounds() {
    let v = positional_repair("{\"a\": 1 \"b\": 2 \"c\": 3}").expect("repaired");
    assert_eq!(v, json!({"a": 1, "b": 2, "c": 3}));
  }

  #[test]
  fn gives_up_on_prose() {
    assert!(positional_repair("not json at all").is_none());
  }
}
