//! Answer Comparator: exact match after lower-casing and trimming.

use crate::domain::Answer;

fn normalize(s: &str) -> String {
  s.trim().to_lowercase()
}

/// A missing answer never matches. Lists are compared position by position
/// and a list never matches a single string (or the other way round).
pub fn answers_match(submitted: Option<&Answer>, canonical: &Answer) -> bool {
  match (submitted, canonical) {
    (Some(Answer::One(s)), Answer::One(c)) => normalize(s) == normalize(c),
    (Some(Answer::Many(s)), Answer::Many(c)) => {
      s.len() == c.len() && s.iter().zip(c).all(|(a, b)| normalize(a) == normalize(b))
    }
    _ => false,
  }
}
