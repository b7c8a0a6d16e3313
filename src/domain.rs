//! Domain models: exam document and module bodies, submitted answers, scores
//! and the feedback bundle returned to callers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The four skill areas. Reading and listening are objective.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
  Reading,
  Listening,
  Writing,
  Speaking,
}

impl ModuleKind {
  pub const ALL: [ModuleKind; 4] =
    [ModuleKind::Reading, ModuleKind::Listening, ModuleKind::Writing, ModuleKind::Speaking];

  /// Top-level key in the document JSON.
  pub fn key(self) -> &'static str {
    match self {
      ModuleKind::Reading => "reading",
      ModuleKind::Listening => "listening",
      ModuleKind::Writing => "writing",
      ModuleKind::Speaking => "speaking",
    }
  }

  /// Name of the array field that carries the module's units.
  pub fn collection_field(self) -> &'static str {
    match self {
      ModuleKind::Reading => "passages",
      ModuleKind::Listening => "sections",
      ModuleKind::Writing => "tasks",
      ModuleKind::Speaking => "parts",
    }
  }

  pub fn is_objective(self) -> bool {
    matches!(self, ModuleKind::Reading | ModuleKind::Listening)
  }
}

impl fmt::Display for ModuleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExamVariant {
  #[default]
  Academic,
  #[serde(alias = "general", alias = "general-training")]
  GeneralTraining,
}

impl ExamVariant {
  pub fn label(self) -> &'static str {
    match self {
      ExamVariant::Academic => "Academic",
      ExamVariant::GeneralTraining => "General Training",
    }
  }
}

/// Which modules a generation request asks for. Missing flags mean "not requested".
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RequestedModules {
  #[serde(default)] pub reading: bool,
  #[serde(default)] pub listening: bool,
  #[serde(default)] pub writing: bool,
  #[serde(default)] pub speaking: bool,
}

impl RequestedModules {
  pub fn only(kind: ModuleKind) -> Self {
    let mut r = Self::default();
    r.set(kind, true);
    r
  }

  pub fn all() -> Self {
    Self { reading: true, listening: true, writing: true, speaking: true }
  }

  pub fn contains(&self, kind: ModuleKind) -> bool {
    match kind {
      ModuleKind::Reading => self.reading,
      ModuleKind::Listening => self.listening,
      ModuleKind::Writing => self.writing,
      ModuleKind::Speaking => self.speaking,
    }
  }

  pub fn set(&mut self, kind: ModuleKind, on: bool) {
    match kind {
      ModuleKind::Reading => self.reading = on,
      ModuleKind::Listening => self.listening = on,
      ModuleKind::Writing => self.writing = on,
      ModuleKind::Speaking => self.speaking = on,
    }
  }

  /// Requested kinds in canonical module order.
  pub fn kinds(&self) -> Vec<ModuleKind> {
    ModuleKind::ALL.into_iter().filter(|k| self.contains(*k)).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.kinds().is_empty()
  }
}

/// A canonical or submitted answer: one string, or an ordered multi-part list.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Answer {
  One(String),
  Many(Vec<String>),
}

impl From<&str> for Answer {
  fn from(s: &str) -> Self {
    Answer::One(s.to_string())
  }
}

impl From<Vec<&str>> for Answer {
  fn from(v: Vec<&str>) -> Self {
    Answer::Many(v.into_iter().map(str::to_string).collect())
  }
}

impl Answer {
  /// Text view of the answer; multi-part answers are joined with spaces.
  pub fn as_text(&self) -> String {
    match self {
      Answer::One(s) => s.clone(),
      Answer::Many(v) => v.join(" "),
    }
  }
}

// Models often emit numbers or booleans where text is expected ("answer": 1999).
impl<'de> Deserialize<'de> for Answer {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    use serde::de::Error;
    use serde_json::Value;

    fn scalar_text(v: &Value) -> Option<String> {
      match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
      }
    }

    let value = Value::deserialize(deserializer)?;
    match &value {
      Value::Array(items) => items
        .iter()
        .map(|v| scalar_text(v).ok_or_else(|| D::Error::custom("answer list items must be scalars")))
        .collect::<Result<Vec<_>, _>>()
        .map(Answer::Many),
      other => scalar_text(other)
        .map(Answer::One)
        .ok_or_else(|| D::Error::custom("answer must be a string or a list of strings")),
    }
  }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  #[serde(alias = "fill-blank", alias = "gap_fill")]
  FillBlank,
  #[serde(alias = "true-false-not-given", alias = "tfng")]
  TrueFalseNotGiven,
  #[serde(alias = "yes-no-not-given", alias = "ynng")]
  YesNoNotGiven,
  #[serde(alias = "multiple-choice", alias = "mcq")]
  MultipleChoice,
  Matching,
  #[serde(alias = "short-answer")]
  #[default]
  ShortAnswer,
  #[serde(alias = "sentence-completion")]
  SentenceCompletion,
  #[serde(alias = "summary-completion")]
  SummaryCompletion,
  #[serde(alias = "note-completion")]
  NoteCompletion,
  #[serde(alias = "table-completion")]
  TableCompletion,
  #[serde(alias = "form-completion")]
  FormCompletion,
  #[serde(other)]
  Other,
}

/// One objective question. `id` is unique within its module.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
  #[serde(deserialize_with = "deserialize_question_id")]
  pub id: u32,
  #[serde(rename = "type", alias = "kind", default)]
  pub kind: QuestionKind,
  #[serde(default, alias = "question")]
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  #[serde(alias = "correct_answer")]
  pub answer: Answer,
}

// Accept `"id": 3` as well as `"id": "3"`.
fn deserialize_question_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  use serde::de::Visitor;

  struct IdVisitor;

  impl<'de> Visitor<'de> for IdVisitor {
    type Value = u32;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
      formatter.write_str("a non-negative integer or numeric string")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
      E: serde::de::Error,
    {
      u32::try_from(value).map_err(|_| E::custom("question id out of range"))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
      E: serde::de::Error,
    {
      u32::try_from(value).map_err(|_| E::custom("question id out of range"))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
      E: serde::de::Error,
    {
      if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
      } else {
        Err(E::custom("question id must be a whole number"))
      }
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
      E: serde::de::Error,
    {
      value.trim().parse::<u32>().map_err(|_| E::custom(format!("invalid question id '{value}'")))
    }
  }

  deserializer.deserialize_any(IdVisitor)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Passage {
  #[serde(default)]
  pub title: String,
  #[serde(default, alias = "content", alias = "passage")]
  pub text: String,
  pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReadingBody {
  pub passages: Vec<Passage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ListeningSection {
  #[serde(default)]
  pub title: String,
  #[serde(default, alias = "script")]
  pub transcript: String,
  pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ListeningBody {
  pub sections: Vec<ListeningSection>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WritingTask {
  /// 1 or 2; missing numbers are filled in by position.
  #[serde(default, alias = "task_number")]
  pub number: u8,
  #[serde(alias = "prompt")]
  pub instructions: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_words: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WritingBody {
  pub tasks: Vec<WritingTask>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpeakingQuestion {
  Text(String),
  Detailed {
    #[serde(alias = "question")]
    text: String,
  },
}

impl SpeakingQuestion {
  pub fn text(&self) -> &str {
    match self {
      SpeakingQuestion::Text(t) => t,
      SpeakingQuestion::Detailed { text } => text,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeakingPart {
  #[serde(default, alias = "part")]
  pub number: u8,
  #[serde(default)]
  pub topic: String,
  pub questions: Vec<SpeakingQuestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeakingBody {
  pub parts: Vec<SpeakingPart>,
}

/// A generated exam. A key is present only if that module was requested.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ExamDocument {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reading: Option<ReadingBody>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub listening: Option<ListeningBody>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub writing: Option<WritingBody>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub speaking: Option<SpeakingBody>,
}

impl ExamDocument {
  pub fn has(&self, kind: ModuleKind) -> bool {
    match kind {
      ModuleKind::Reading => self.reading.is_some(),
      ModuleKind::Listening => self.listening.is_some(),
      ModuleKind::Writing => self.writing.is_some(),
      ModuleKind::Speaking => self.speaking.is_some(),
    }
  }

  pub fn modules(&self) -> Vec<ModuleKind> {
    ModuleKind::ALL.into_iter().filter(|k| self.has(*k)).collect()
  }

  /// Objective questions of a module in generation order.
  pub fn objective_questions(&self, kind: ModuleKind) -> Vec<&Question> {
    match kind {
      ModuleKind::Reading => self
        .reading
        .iter()
        .flat_map(|b| b.passages.iter())
        .flat_map(|p| p.questions.iter())
        .collect(),
      ModuleKind::Listening => self
        .listening
        .iter()
        .flat_map(|b| b.sections.iter())
        .flat_map(|s| s.questions.iter())
        .collect(),
      _ => Vec::new(),
    }
  }

  fn objective_questions_mut(&mut self, kind: ModuleKind) -> Vec<&mut Question> {
    match kind {
      ModuleKind::Reading => self
        .reading
        .iter_mut()
        .flat_map(|b| b.passages.iter_mut())
        .flat_map(|p| p.questions.iter_mut())
        .collect(),
      ModuleKind::Listening => self
        .listening
        .iter_mut()
        .flat_map(|b| b.sections.iter_mut())
        .flat_map(|s| s.questions.iter_mut())
        .collect(),
      _ => Vec::new(),
    }
  }

  /// Renumber objective questions 1..n in generation order when their ids
  /// are not already contiguous and increasing. Returns the modules touched.
  pub fn normalize_question_ids(&mut self) -> Vec<ModuleKind> {
    let mut touched = Vec::new();
    for kind in [ModuleKind::Reading, ModuleKind::Listening] {
      let mut questions = self.objective_questions_mut(kind);
      let Some(first) = questions.first().map(|q| q.id) else { continue };
      let contiguous = questions
        .iter()
        .enumerate()
        .all(|(i, q)| q.id as usize == first as usize + i);
      if contiguous {
        continue;
      }
      for (i, q) in questions.iter_mut().enumerate() {
        q.id = i as u32 + 1;
      }
      touched.push(kind);
    }
    self.fill_part_numbers();
    touched
  }

  /// True when a writing task or speaking part carries no number.
  pub fn has_unnumbered_parts(&self) -> bool {
    self.writing.iter().flat_map(|w| &w.tasks).any(|t| t.number == 0)
      || self.speaking.iter().flat_map(|s| &s.parts).any(|p| p.number == 0)
  }

  /// Writing tasks and speaking parts without a number take their 1-based
  /// position.
  pub fn fill_part_numbers(&mut self) {
    if let Some(w) = self.writing.as_mut() {
      for (i, t) in w.tasks.iter_mut().enumerate() {
        if t.number == 0 {
          t.number = i as u8 + 1;
        }
      }
    }
    if let Some(s) = self.speaking.as_mut() {
      for (i, p) in s.parts.iter_mut().enumerate() {
        if p.number == 0 {
          p.number = i as u8 + 1;
        }
      }
    }
  }
}

/// Submitted answers for one module, keyed by question identity as a string
/// (writing: task number, speaking: part number).
pub type ModuleAnswers = BTreeMap<String, Answer>;

/// Per-attempt answers, owned by the caller and read-only to the evaluator.
pub type AnswerMap = BTreeMap<ModuleKind, ModuleAnswers>;

/// Band scores in [0, 9], 0.5 steps. `overall` is derived, never supplied.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleScores {
  #[serde(default, skip_serializing_if = "Option::is_none")] pub reading: Option<f32>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub listening: Option<f32>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub writing: Option<f32>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub speaking: Option<f32>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub overall: Option<f32>,
}

impl ModuleScores {
  pub fn get(&self, kind: ModuleKind) -> Option<f32> {
    match kind {
      ModuleKind::Reading => self.reading,
      ModuleKind::Listening => self.listening,
      ModuleKind::Writing => self.writing,
      ModuleKind::Speaking => self.speaking,
    }
  }

  pub fn set(&mut self, kind: ModuleKind, band: f32) {
    let slot = match kind {
      ModuleKind::Reading => &mut self.reading,
      ModuleKind::Listening => &mut self.listening,
      ModuleKind::Writing => &mut self.writing,
      ModuleKind::Speaking => &mut self.speaking,
    };
    *slot = Some(band);
  }

  /// Present module scores in canonical order.
  pub fn present(&self) -> Vec<(ModuleKind, f32)> {
    ModuleKind::ALL
      .into_iter()
      .filter_map(|k| self.get(k).map(|b| (k, b)))
      .collect()
  }
}

/// Where a feedback entry's text came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
  Generated,
  Fallback,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModuleFeedback {
  pub strengths: Vec<String>,
  pub weaknesses: Vec<String>,
  pub advice: String,
  pub source: FeedbackSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WritingFeedback {
  #[serde(flatten)]
  pub module: ModuleFeedback,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task1_critique: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task2_critique: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OverallFeedback {
  pub summary: String,
  pub next_steps: Vec<String>,
  pub source: FeedbackSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct FeedbackBundle {
  #[serde(default, skip_serializing_if = "Option::is_none")] pub reading: Option<ModuleFeedback>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub listening: Option<ModuleFeedback>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub writing: Option<WritingFeedback>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub speaking: Option<ModuleFeedback>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub overall: Option<OverallFeedback>,
}

/// Result of one evaluation call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
  pub scores: ModuleScores,
  pub feedback: FeedbackBundle,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn question_accepts_string_ids_and_numeric_answers() {
    let q: Question = serde_json::from_value(json!({
      "id": "4", "type": "fill-blank", "question": "Year?", "answer": 1999
    }))
    .expect("question");
    assert_eq!(q.id, 4);
    assert_eq!(q.kind, QuestionKind::FillBlank);
    assert_eq!(q.answer, Answer::One("1999".into()));
  }

  #[test]
  fn unknown_question_kind_decodes_to_other() {
    let q: Question =
      serde_json::from_value(json!({"id": 1, "type": "diagram_label", "answer": ["a", "b"]})).expect("question");
    assert_eq!(q.kind, QuestionKind::Other);
    assert_eq!(q.answer, Answer::Many(vec!["a".into(), "b".into()]));
  }

  #[test]
  fn absent_modules_are_not_serialized() {
    let doc = ExamDocument {
      writing: Some(WritingBody {
        tasks: vec![WritingTask { number: 1, instructions: "Describe".into(), min_words: None }],
      }),
      ..Default::default()
    };
    let v = serde_json::to_value(&doc).expect("json");
    assert_eq!(v.as_object().map(|o| o.len()), Some(1));
    assert!(v.get("writing").is_some());
  }

  #[test]
  fn non_contiguous_ids_are_renumbered_in_order() {
    let q = |id: u32| Question {
      id,
      kind: QuestionKind::ShortAnswer,
      text: String::new(),
      options: None,
      answer: "x".into(),
    };
    let mut doc = ExamDocument {
      reading: Some(ReadingBody {
        passages: vec![
          Passage { title: String::new(), text: String::new(), questions: vec![q(1), q(2)] },
          Passage { title: String::new(), text: String::new(), questions: vec![q(5), q(6)] },
        ],
      }),
      ..Default::default()
    };
    assert_eq!(doc.normalize_question_ids(), vec![ModuleKind::Reading]);
    let ids: Vec<u32> = doc.objective_questions(ModuleKind::Reading).iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
  }

  #[test]
  fn unnumbered_tasks_and_parts_take_their_position() {
    let mut doc: ExamDocument = serde_json::from_value(json!({
      "writing": {"tasks": [{"instructions": "Describe"}, {"number": 2, "instructions": "Discuss"}]},
      "speaking": {"parts": [{"questions": ["Where do you live?"]}]}
    }))
    .expect("document");
    assert!(doc.has_unnumbered_parts());
    doc.fill_part_numbers();
    assert!(!doc.has_unnumbered_parts());
    let tasks: Vec<u8> = doc.writing.iter().flat_map(|w| &w.tasks).map(|t| t.number).collect();
    assert_eq!(tasks, vec![1, 2]);
    assert_eq!(doc.speaking.as_ref().map(|s| s.parts[0].number), Some(1));
  }

  #[test]
  fn requested_modules_default_to_false() {
    let r: RequestedModules = serde_json::from_value(json!({"reading": true})).expect("modules");
    assert_eq!(r.kinds(), vec![ModuleKind::Reading]);
  }
}
