//! Content validation: structural pass/fail over a recovered JSON object.
//!
//! No repair happens here. `validate` checks presence and per-module shape;
//! `into_document` additionally decodes the typed `ExamDocument`.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::{ExamDocument, ModuleKind, RequestedModules};
use crate::error::ValidationError;

/// Every requested module present, each with its expected shape.
pub fn validate(candidate: &Value, requested: &RequestedModules) -> Result<(), ValidationError> {
  if requested.is_empty() {
    return Err(ValidationError::NothingRequested);
  }
  let obj = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

  for kind in requested.kinds() {
    let body = module_body(obj, kind)?;
    check_shape(kind, body)?;
  }
  Ok(())
}

/// Validate, then decode the requested modules into a typed document.
/// Modules that were not requested are ignored.
pub fn into_document(candidate: &Value, requested: &RequestedModules) -> Result<ExamDocument, ValidationError> {
  validate(candidate, requested)?;
  let obj = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

  let mut doc = ExamDocument::default();
  for kind in requested.kinds() {
    let body = module_body(obj, kind)?;
    match kind {
      ModuleKind::Reading => doc.reading = Some(decode(kind, body)?),
      ModuleKind::Listening => doc.listening = Some(decode(kind, body)?),
      ModuleKind::Writing => doc.writing = Some(decode(kind, body)?),
      ModuleKind::Speaking => doc.speaking = Some(decode(kind, body)?),
    }
  }

  for kind in [ModuleKind::Reading, ModuleKind::Listening] {
    let mut seen = HashSet::new();
    for q in doc.objective_questions(kind) {
      if !seen.insert(q.id) {
        return Err(ValidationError::malformed(kind, format!("question id {} appears more than once", q.id)));
      }
    }
  }
  Ok(doc)
}

fn module_body(obj: &Map<String, Value>, kind: ModuleKind) -> Result<&Value, ValidationError> {
  match obj.get(kind.key()) {
    Some(Value::Null) | None => Err(ValidationError::MissingModule(kind)),
    Some(body) => Ok(body),
  }
}

fn decode<T: DeserializeOwned>(kind: ModuleKind, body: &Value) -> Result<T, ValidationError> {
  serde_json::from_value(body.clone())
    .map_err(|e| ValidationError::malformed(kind, format!("does not match the {kind} schema: {e}")))
}

fn non_empty_array<'a>(v: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
  v.get(field).and_then(Value::as_array).filter(|a| !a.is_empty())
}

fn has_text(v: &Value, fields: &[&str]) -> bool {
  fields
    .iter()
    .any(|f| v.get(*f).and_then(Value::as_str).map_or(false, |s| !s.trim().is_empty()))
}

fn has_value(v: &Value, fields: &[&str]) -> bool {
  fields.iter().any(|f| v.get(*f).map_or(false, |x| !x.is_null()))
}

fn check_shape(kind: ModuleKind, body: &Value) -> Result<(), ValidationError> {
  if !body.is_object() {
    return Err(ValidationError::malformed(kind, "module body is not an object"));
  }
  let field = kind.collection_field();
  let units = body
    .get(field)
    .and_then(Value::as_array)
    .ok_or_else(|| ValidationError::malformed(kind, format!("`{field}` array is missing")))?;
  if units.is_empty() {
    return Err(ValidationError::malformed(kind, format!("`{field}` is empty")));
  }

  for (i, unit) in units.iter().enumerate() {
    if !unit.is_object() {
      return Err(ValidationError::malformed(kind, format!("{field}[{i}] is not an object")));
    }
    match kind {
      ModuleKind::Reading | ModuleKind::Listening => {
        let questions = non_empty_array(unit, "questions")
          .ok_or_else(|| ValidationError::malformed(kind, format!("{field}[{i}] has no questions")))?;
        for (j, q) in questions.iter().enumerate() {
          if !has_value(q, &["id"]) {
            return Err(ValidationError::malformed(kind, format!("{field}[{i}].questions[{j}] has no id")));
          }
          if !has_value(q, &["answer", "correct_answer"]) {
            return Err(ValidationError::malformed(kind, format!("{field}[{i}].questions[{j}] has no answer")));
          }
        }
      }
      ModuleKind::Writing => {
        if !has_text(unit, &["instructions", "prompt"]) {
          return Err(ValidationError::malformed(kind, format!("{field}[{i}] has no instructions")));
        }
      }
      ModuleKind::Speaking => {
        non_empty_array(unit, "questions")
          .ok_or_else(|| ValidationError::malformed(kind, format!("{field}[{i}] has no questions")))?;
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn reading() -> Value {
    json!({"passages": [{"title": "T", "text": "P", "questions": [
      {"id": 1, "type": "multiple_choice", "question": "Q", "options": ["A", "B"], "answer": "A"}
    ]}]})
  }

  #[test]
  fn accepts_requested_module_with_expected_shape() {
    let doc = into_document(&json!({"reading": reading()}), &RequestedModules::only(ModuleKind::Reading))
      .expect("valid");
    assert!(doc.reading.is_some());
    assert_eq!(doc.modules(), vec![ModuleKind::Reading]);
  }

  #[test]
  fn missing_requested_module_is_named() {
    let err = validate(&json!({"reading": reading()}), &RequestedModules { reading: true, writing: true, ..Default::default() })
      .expect_err("missing writing");
    assert_eq!(err, ValidationError::MissingModule(ModuleKind::Writing));
  }

  #[test]
  fn null_module_counts_as_missing() {
    let err = validate(&json!({"reading": null}), &RequestedModules::only(ModuleKind::Reading)).expect_err("null");
    assert_eq!(err, ValidationError::MissingModule(ModuleKind::Reading));
  }

  #[test]
  fn empty_collection_is_malformed() {
    let err = validate(&json!({"listening": {"sections": []}}), &RequestedModules::only(ModuleKind::Listening))
      .expect_err("empty");
    assert_eq!(err, ValidationError::malformed(ModuleKind::Listening, "`sections` is empty"));
  }

  #[test]
  fn question_without_answer_is_malformed() {
    let body = json!({"passages": [{"questions": [{"id": 1, "question": "Q"}]}]});
    let err = validate(&json!({"reading": body}), &RequestedModules::only(ModuleKind::Reading)).expect_err("no answer");
    assert!(matches!(err, ValidationError::MalformedModule { module: ModuleKind::Reading, ref expectation }
      if expectation.contains("has no answer")));
  }

  #[test]
  fn writing_task_needs_instructions() {
    let err = validate(&json!({"writing": {"tasks": [{"number": 1}]}}), &RequestedModules::only(ModuleKind::Writing))
      .expect_err("no instructions");
    assert_eq!(err, ValidationError::malformed(ModuleKind::Writing, "tasks[0] has no instructions"));
  }

  #[test]
  fn unrequested_modules_are_dropped() {
    let candidate = json!({"reading": reading(), "speaking": {"parts": []}});
    let doc = into_document(&candidate, &RequestedModules::only(ModuleKind::Reading)).expect("valid");
    assert!(doc.speaking.is_none());
  }

  #[test]
  fn duplicate_question_ids_are_rejected() {
    let body = json!({"passages": [{"questions": [{"id": 1, "answer": "a"}, {"id": "1", "answer": "b"}]}]});
    let err = into_document(&json!({"reading": body}), &RequestedModules::only(ModuleKind::Reading)).expect_err("dup");
    assert_eq!(err, ValidationError::malformed(ModuleKind::Reading, "question id 1 appears more than once"));
  }

  #[test]
  fn nothing_requested_fails_fast() {
    assert_eq!(validate(&json!({}), &RequestedModules::default()), Err(ValidationError::NothingRequested));
  }
}
