//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
  text.split_whitespace().count()
}

/// Log-safe truncation for large strings.
/// Cuts on a char boundary so multi-byte text never panics.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Round to the nearest 0.5, halves going up.
pub fn round_half_up_to_half(x: f32) -> f32 {
  ((x as f64) * 2.0 + 0.5).floor() as f32 / 2.0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_every_occurrence() {
    let out = fill_template("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and x then y");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "ééééé";
    let t = trunc_for_log(s, 3);
    assert!(t.starts_with('é'));
    assert!(t.contains("10 bytes total"));
  }

  #[test]
  fn half_up_rounding() {
    assert_eq!(round_half_up_to_half(7.25), 7.5);
    assert_eq!(round_half_up_to_half(7.24), 7.0);
    assert_eq!(round_half_up_to_half(6.75), 7.0);
    assert_eq!(round_half_up_to_half(6.5), 6.5);
  }
}
