//! Canonicalization pass: rewrite near-JSON into JSON without parsing it.
//!
//! A single left-to-right scan that tracks container nesting, whether an
//! object key is expected, and string state. Text outside the outermost
//! braces (prose between fragments) is copied untouched so block
//! segmentation can still find every fragment afterwards.

/// Rewrite `input` toward strict JSON. Valid JSON comes out structurally identical.
pub fn canonicalize(input: &str) -> String {
  let chars: Vec<char> = input.chars().map(straighten_quote).collect();
  let mut out = String::with_capacity(input.len() + 16);
  let mut stack: Vec<char> = Vec::new();
  let mut expect_key = false;
  let mut last_balanced: Option<usize> = None;
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];

    if stack.is_empty() {
      if c == '{' {
        stack.push('{');
        expect_key = true;
      }
      out.push(c);
      i += 1;
      continue;
    }

    match c {
      '"' => i = copy_string(&chars, i, '"', &mut out),
      '\'' => i = copy_string(&chars, i, '\'', &mut out),
      '/' if chars.get(i + 1) == Some(&'/') => i = skip_line_comment(&chars, i),
      '/' if chars.get(i + 1) == Some(&'*') => i = skip_block_comment(&chars, i),
      '{' | '[' => {
        stack.push(c);
        expect_key = c == '{';
        out.push(c);
        i += 1;
      }
      '}' | ']' => {
        strip_trailing_comma(&mut out);
        stack.pop();
        expect_key = false;
        out.push(c);
        if stack.is_empty() {
          last_balanced = Some(out.len());
        }
        i += 1;
      }
      ',' => {
        // Drop doubled or leading commas.
        if !matches!(last_significant(&out), Some(',') | Some('{') | Some('[')) {
          out.push(',');
        }
        expect_key = stack.last() == Some(&'{');
        i += 1;
      }
      ':' => {
        expect_key = false;
        out.push(':');
        i += 1;
      }
      c if c.is_whitespace() => {
        out.push(c);
        i += 1;
      }
      c if c.is_control() => i += 1,
      _ if expect_key => i = bare_key(&chars, i, &mut out),
      _ => i = bare_value(&chars, i, &mut out),
    }
  }

  // Drop trailing junk after the last fully closed object.
  if let Some(end) = last_balanced {
    out.truncate(end);
  }
  out
}

fn straighten_quote(c: char) -> char {
  match c {
    '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}' => '"',
    // Curly singles are almost always apostrophes inside text.
    '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
    _ => c,
  }
}

fn last_significant(out: &str) -> Option<char> {
  out.chars().rev().find(|c| !c.is_whitespace())
}

fn strip_trailing_comma(out: &mut String) {
  let trimmed_len = out.trim_end().len();
  if out[..trimmed_len].ends_with(',') {
    out.remove(trimmed_len - 1);
  }
}

/// A quote closes a string only if what follows can legally follow a string.
fn closes_string(chars: &[char], mut j: usize) -> bool {
  let mut saw_newline = false;
  while j < chars.len() && chars[j].is_whitespace() {
    saw_newline |= chars[j] == '\n';
    j += 1;
  }
  if j >= chars.len() || saw_newline {
    return true;
  }
  matches!(chars[j], ',' | '}' | ']' | ':' | '"' | '/')
}

/// Copy a string literal delimited by `quote`, emitting it double-quoted.
/// Returns the index after the closing delimiter (or the end of input).
fn copy_string(chars: &[char], start: usize, quote: char, out: &mut String) -> usize {
  out.push('"');
  let mut i = start + 1;
  while i < chars.len() {
    let c = chars[i];
    match c {
      '\\' => i = copy_escape(chars, i, out),
      _ if c == quote => {
        if closes_string(chars, i + 1) {
          out.push('"');
          return i + 1;
        }
        out.push_str(if quote == '"' { "\\\"" } else { "'" });
        i += 1;
      }
      '"' => {
        out.push_str("\\\"");
        i += 1;
      }
      '\n' => {
        out.push_str("\\n");
        i += 1;
      }
      '\t' => {
        out.push_str("\\t");
        i += 1;
      }
      c if c.is_control() => i += 1,
      c => {
        out.push(c);
        i += 1;
      }
    }
  }
  // Unterminated at end of input.
  out.push('"');
  i
}

fn copy_escape(chars: &[char], i: usize, out: &mut String) -> usize {
  let Some(&next) = chars.get(i + 1) else {
    out.push_str("\\\\");
    return i + 1;
  };
  match next {
    '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => {
      out.push('\\');
      out.push(next);
      i + 2
    }
    'u' if chars.len() >= i + 6 && chars[i + 2..i + 6].iter().all(|c| c.is_ascii_hexdigit()) => {
      out.push('\\');
      out.extend(&chars[i + 1..i + 6]);
      i + 6
    }
    '\'' => {
      out.push('\'');
      i + 2
    }
    '\n' => {
      out.push_str("\\n");
      i + 2
    }
    // Lone backslash: keep it as a literal character.
    _ => {
      out.push_str("\\\\");
      i + 1
    }
  }
}

fn skip_line_comment(chars: &[char], mut i: usize) -> usize {
  while i < chars.len() && chars[i] != '\n' {
    i += 1;
  }
  i
}

fn skip_block_comment(chars: &[char], start: usize) -> usize {
  let mut i = start + 2;
  while i + 1 < chars.len() {
    if chars[i] == '*' && chars[i + 1] == '/' {
      return i + 2;
    }
    i += 1;
  }
  chars.len()
}

fn starts_comment(chars: &[char], j: usize) -> bool {
  chars[j] == '/' && matches!(chars.get(j + 1), Some('/') | Some('*'))
}

/// Unquoted property name: everything up to the colon.
fn bare_key(chars: &[char], start: usize, out: &mut String) -> usize {
  let mut j = start;
  while j < chars.len() && !matches!(chars[j], ':' | ',' | '}' | ']' | '{' | '[' | '"' | '\n') && !starts_comment(chars, j) {
    j += 1;
  }
  if j == start {
    out.push(chars[start]);
    return start + 1;
  }
  let token: String = chars[start..j].iter().collect();
  push_quoted(token.trim(), out);
  j
}

/// Unquoted value: keywords and numbers pass through, anything else is quoted.
fn bare_value(chars: &[char], start: usize, out: &mut String) -> usize {
  let mut j = start;
  while j < chars.len() && !matches!(chars[j], ',' | '}' | ']' | '{' | '[' | '"' | '\n') && !starts_comment(chars, j) {
    j += 1;
  }
  if j == start {
    out.push(chars[start]);
    return start + 1;
  }
  let token: String = chars[start..j].iter().collect();
  let token = token.trim();
  match token {
    "true" | "false" | "null" => out.push_str(token),
    "True" | "TRUE" => out.push_str("true"),
    "False" | "FALSE" => out.push_str("false"),
    "None" | "NULL" | "undefined" => out.push_str("null"),
    _ if serde_json::from_str::<serde_json::Number>(token).is_ok() => out.push_str(token),
    _ => push_quoted(token, out),
  }
  j
}

fn push_quoted(token: &str, out: &mut String) {
  out.push('"');
  for c in token.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      c if c.is_control() => {}
      c => out.push(c),
    }
  }
  out.push('"');
}
