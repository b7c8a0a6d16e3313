//! Text recovery: turn free-form model output into one JSON object.
//!
//! Flow:
//! 1) Working text: fenced code block if present, else first `{` .. last `}`.
//! 2) Canonicalization (quotes, comments, trailing commas, bare words, raw newlines).
//! 3) Ordered strategies, first success wins:
//!    direct parse → positional repair → block segmentation → partial salvage.
//!
//! Nothing in here panics on bad input; every attempt is a `Result`/`Option`
//! and a miss escalates to the next strategy.

pub mod canonicalize;
pub mod fence;
pub mod repair;
pub mod salvage;
pub mod segment;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RecoveryError;
use crate::util::trunc_for_log;

/// One recovery strategy over the canonicalized text.
pub type Strategy = fn(&str) -> Option<Value>;

/// Strategies in the order they are tried.
pub const STRATEGIES: [(&str, Strategy); 4] = [
  ("direct_parse", direct_parse),
  ("positional_repair", repair::positional_repair),
  ("block_segmentation", segment::recover_blocks),
  ("partial_salvage", salvage::salvage_sections),
];

/// Recover a JSON object from raw model text.
pub fn recover(raw: &str) -> Result<Value, RecoveryError> {
  let working = fence::working_text(raw);
  let canonical = canonicalize::canonicalize(working);

  for (name, strategy) in STRATEGIES {
    if let Some(value) = strategy(&canonical) {
      debug!(target: "synthesis", strategy = name, raw_len = raw.len(), "Recovered JSON object");
      return Ok(value);
    }
  }

  warn!(target: "synthesis", raw_len = raw.len(), preview = %trunc_for_log(raw, 160), "All recovery strategies failed");
  Err(RecoveryError { raw: raw.to_string() })
}

/// Parse as-is; only objects count.
pub fn direct_parse(text: &str) -> Option<Value> {
  serde_json::from_str::<Value>(text).ok().filter(Value::is_object)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn reading_doc() -> Value {
    json!({
      "reading": {
        "passages": [{
          "title": "Bees",
          "text": "Bees \"dance\" to communicate.\nThey also hum.",
          "questions": [
            {"id": 1, "type": "true_false_not_given", "question": "Bees dance.", "answer": "TRUE"},
            {"id": 2, "type": "fill_blank", "question": "Bees ___.", "answer": ["hum", "dance"]}
          ]
        }]
      }
    })
  }

  #[test]
  fn valid_json_is_returned_unchanged() {
    let doc = reading_doc();
    let text = serde_json::to_string_pretty(&doc).expect("json");
    assert_eq!(recover(&text).expect("recovered"), doc);
    let compact = serde_json::to_string(&doc).expect("json");
    assert_eq!(recover(&compact).expect("recovered"), doc);
  }

  #[test]
  fn fenced_json_with_prose_matches_unwrapped() {
    let doc = reading_doc();
    let text = format!(
      "Sure! Here is your exam:\n\n```json\n{}\n```\n\nLet me know if you need changes.",
      serde_json::to_string_pretty(&doc).expect("json")
    );
    assert_eq!(recover(&text).expect("recovered"), doc);
  }

  #[test]
  fn combined_lenient_syntax_matches_clean_version() {
    let messy = r#"{
      title: "Bees",
      "answer": 'not given',
      "count": 3,
    }"#;
    let clean = json!({"title": "Bees", "answer": "not given", "count": 3});
    assert_eq!(recover(messy).expect("recovered"), clean);
  }

  #[test]
  fn two_objects_with_prose_between_recover_the_first() {
    let text = r#"{"reading": {"passages": []}} and here is a second attempt: {"listening": {"sections": []}}"#;
    let v = recover(text).expect("recovered");
    assert_eq!(v, json!({"reading": {"passages": []}}));
  }

  #[test]
  fn missing_comma_is_repaired() {
    let text = "{\"a\": 1 \"b\": 2}";
    assert_eq!(recover(text).expect("recovered"), json!({"a": 1, "b": 2}));
  }

  #[test]
  fn truncated_output_is_closed() {
    let text = r#"{"writing": {"tasks": [{"number": 1, "instructions": "Describe the chart"#;
    let v = recover(text).expect("recovered");
    assert_eq!(v["writing"]["tasks"][0]["instructions"], json!("Describe the chart"));
  }

  #[test]
  fn prose_only_is_unrecoverable_and_keeps_raw_text() {
    let raw = "I'm sorry, I cannot generate that exam right now.";
    let err = recover(raw).expect_err("no json");
    assert_eq!(err.raw, raw);
  }

  #[test]
  fn empty_input_never_panics() {
    assert!(recover("").is_err());
    assert!(recover("```json\n```").is_err());
    assert_eq!(recover("{").expect("closed"), json!({}));
    let _ = recover("}{\"a\": [1, {\"b\": '");
  }
}
