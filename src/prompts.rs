//! Prompt Builder: fills the configured templates.
//!
//! The service takes a single prompt string, so each prompt is the system
//! text followed by the filled user template.

use serde_json::{json, Map, Value};

use crate::config::Prompts;
use crate::domain::{ExamVariant, ModuleKind, ModuleScores, RequestedModules};
use crate::util::{fill_template, word_count};

fn compose(system: &str, user: &str) -> String {
  format!("{system}\n\n{user}")
}

/// Illustrative body for one module, embedded in the generation prompt.
pub fn example_shape(kind: ModuleKind) -> Value {
  match kind {
    ModuleKind::Reading => json!({
      "passages": [{
        "title": "Passage title",
        "text": "Passage text of 700-900 words.",
        "questions": [
          {"id": 1, "type": "true_false_not_given", "question": "Statement to judge.", "answer": "TRUE"},
          {"id": 2, "type": "multiple_choice", "question": "Question?", "options": ["A", "B", "C", "D"], "answer": "B"},
          {"id": 3, "type": "fill_blank", "question": "Complete: ___ and ___.", "answer": ["word one", "word two"]}
        ]
      }]
    }),
    ModuleKind::Listening => json!({
      "sections": [{
        "title": "Section title",
        "transcript": "Full transcript of the recording.",
        "questions": [
          {"id": 1, "type": "form_completion", "question": "Name: ___", "answer": "Sarah"},
          {"id": 2, "type": "matching", "question": "Match the speaker to the opinion.", "options": ["A", "B", "C"], "answer": "C"}
        ]
      }]
    }),
    ModuleKind::Writing => json!({
      "tasks": [
        {"number": 1, "instructions": "Task 1 instructions.", "min_words": 150},
        {"number": 2, "instructions": "Task 2 essay question.", "min_words": 250}
      ]
    }),
    ModuleKind::Speaking => json!({
      "parts": [
        {"number": 1, "topic": "Home town", "questions": ["Where are you from?"]},
        {"number": 2, "topic": "Cue card", "questions": ["Describe a place you enjoy visiting."]},
        {"number": 3, "topic": "Discussion", "questions": ["Why do people travel?"]}
      ]
    }),
  }
}

fn module_guidance(kind: ModuleKind, variant: ExamVariant) -> &'static str {
  match (kind, variant) {
    (ModuleKind::Reading, ExamVariant::Academic) =>
      "- reading: 3 passages from academic sources (journals, textbooks), 13-14 questions each.",
    (ModuleKind::Reading, ExamVariant::GeneralTraining) =>
      "- reading: 3 passages of everyday and workplace texts (notices, leaflets, articles), 13-14 questions each.",
    (ModuleKind::Listening, _) =>
      "- listening: 4 sections with full transcripts, 10 questions each.",
    (ModuleKind::Writing, ExamVariant::Academic) =>
      "- writing: task 1 describes a chart, table or diagram (min 150 words); task 2 is an argumentative essay (min 250 words).",
    (ModuleKind::Writing, ExamVariant::GeneralTraining) =>
      "- writing: task 1 is a letter for an everyday situation (min 150 words); task 2 is an opinion essay (min 250 words).",
    (ModuleKind::Speaking, _) =>
      "- speaking: part 1 interview questions, part 2 one cue card, part 3 discussion questions.",
  }
}

pub fn generation_prompt(p: &Prompts, variant: ExamVariant, requested: &RequestedModules) -> String {
  let kinds = requested.kinds();
  let modules = kinds.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ");
  let guidance = kinds.iter().map(|k| module_guidance(*k, variant)).collect::<Vec<_>>().join("\n");

  let mut shape = Map::new();
  for k in &kinds {
    shape.insert(k.key().to_string(), example_shape(*k));
  }
  let shape = format!("{:#}", Value::Object(shape));

  let user = fill_template(
    &p.generation_user_template,
    &[("variant", variant.label()), ("modules", &modules), ("module_guidance", &guidance), ("example_shape", &shape)],
  );
  compose(&p.generation_system, &user)
}

/// One writing task as seen by the evaluation prompt.
pub struct TaskResponse<'a> {
  pub instructions: &'a str,
  pub response: &'a str,
}

pub fn writing_eval_prompt(p: &Prompts, variant: ExamVariant, task1: &TaskResponse<'_>, task2: &TaskResponse<'_>) -> String {
  let (w1, w2) = (word_count(task1.response).to_string(), word_count(task2.response).to_string());
  let user = fill_template(
    &p.writing_eval_user_template,
    &[
      ("variant", variant.label()),
      ("task1_instructions", task1.instructions),
      ("task1_response", task1.response),
      ("task1_words", &w1),
      ("task2_instructions", task2.instructions),
      ("task2_response", task2.response),
      ("task2_words", &w2),
    ],
  );
  compose(&p.writing_eval_system, &user)
}

/// `parts` are (part number, topic, transcript).
pub fn speaking_eval_prompt(p: &Prompts, variant: ExamVariant, parts: &[(u8, &str, &str)]) -> String {
  let rendered = parts
    .iter()
    .map(|(n, topic, transcript)| format!("Part {n} ({topic}):\n{transcript}"))
    .collect::<Vec<_>>()
    .join("\n\n");
  let user = fill_template(&p.speaking_eval_user_template, &[("variant", variant.label()), ("parts", &rendered)]);
  compose(&p.speaking_eval_system, &user)
}

pub fn feedback_prompt(p: &Prompts, kind: ModuleKind, band: f32, context: &str) -> String {
  let band = format!("{band:.1}");
  let user = fill_template(&p.feedback_user_template, &[("module", kind.key()), ("band", &band), ("context", context)]);
  compose(&p.feedback_system, &user)
}

pub fn critique_prompt(p: &Prompts, task_number: u8, instructions: &str, response: &str) -> String {
  let n = task_number.to_string();
  let user = fill_template(
    &p.critique_user_template,
    &[("task_number", &n), ("instructions", instructions), ("response", response)],
  );
  compose(&p.critique_system, &user)
}

pub fn overall_prompt(p: &Prompts, scores: &ModuleScores) -> String {
  let mut parts: Vec<String> = scores.present().iter().map(|(k, b)| format!("{k} {b:.1}")).collect();
  if let Some(o) = scores.overall {
    parts.push(format!("overall {o:.1}"));
  }
  let user = fill_template(&p.overall_user_template, &[("scores", &parts.join(", "))]);
  compose(&p.overall_system, &user)
}
