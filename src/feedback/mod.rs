//! Feedback Synthesizer.
//!
//! Replies are sliced at their labels ("Strengths:", "Weaknesses:", "Advice:",
//! "Summary:", "Next steps:"). A module whose reply is missing any part gets
//! the static entry for its tier instead, never a mix of the two.

pub mod bank;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{FeedbackSource, ModuleFeedback, ModuleKind, ModuleScores, OverallFeedback, WritingFeedback, WritingTask};
use crate::engine::Engine;
use crate::prompts::{critique_prompt, feedback_prompt, overall_prompt};

pub use bank::Tier;

static LABEL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?im)^[ \t#>*\-]*(strengths|weaknesses|advice|summary|next steps)[ \t]*\**[ \t]*:[ \t]*\**")
    .expect("label regex")
});
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*•·]|\d+[.)])\s*").expect("bullet regex"));

const MAX_ITEMS: usize = 5;

/// Body text after each label, up to the next label. First occurrence wins.
pub fn label_sections(reply: &str) -> HashMap<String, &str> {
  let marks: Vec<(String, usize, usize)> = LABEL
    .captures_iter(reply)
    .filter_map(|c| {
      let whole = c.get(0)?;
      Some((c[1].to_lowercase(), whole.start(), whole.end()))
    })
    .collect();

  let mut out = HashMap::new();
  for (i, (label, _, body_start)) in marks.iter().enumerate() {
    let body_end = marks.get(i + 1).map_or(reply.len(), |m| m.1);
    out.entry(label.clone()).or_insert_with(|| reply[*body_start..body_end].trim());
  }
  out
}

/// Bulleted or numbered lines as a list, markers removed.
pub fn split_items(body: &str) -> Vec<String> {
  body
    .lines()
    .map(|l| BULLET.replace(l, "").trim().trim_matches('*').trim().to_string())
    .filter(|l| !l.is_empty())
    .take(MAX_ITEMS)
    .collect()
}

fn first_sentence(text: &str) -> String {
  let text = text.trim();
  let mut chars = text.char_indices().peekable();
  while let Some((i, c)) = chars.next() {
    if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |(_, n)| n.is_whitespace()) {
      return text[..i + c.len_utf8()].to_string();
    }
  }
  text.to_string()
}

pub fn parse_module_feedback(reply: &str) -> Option<ModuleFeedback> {
  let sections = label_sections(reply);
  let strengths = split_items(sections.get("strengths")?);
  let weaknesses = split_items(sections.get("weaknesses")?);
  let advice = split_items(sections.get("advice")?).first().map(|s| first_sentence(s))?;
  if strengths.is_empty() || weaknesses.is_empty() || advice.is_empty() {
    return None;
  }
  Some(ModuleFeedback { strengths, weaknesses, advice, source: FeedbackSource::Generated })
}

pub fn parse_overall_feedback(reply: &str) -> Option<OverallFeedback> {
  let sections = label_sections(reply);
  let summary = split_items(sections.get("summary")?).first().map(|s| first_sentence(s))?;
  let next_steps = split_items(sections.get("next steps")?);
  if summary.is_empty() || next_steps.is_empty() {
    return None;
  }
  Some(OverallFeedback { summary, next_steps, source: FeedbackSource::Generated })
}

pub async fn module_feedback(engine: &Engine, kind: ModuleKind, band: f32, context: &str) -> ModuleFeedback {
  let prompt = feedback_prompt(&engine.prompts, kind, band, context);
  match engine.ask(&prompt).await {
    Ok(reply) => match parse_module_feedback(&reply) {
      Some(f) => {
        debug!(target: "feedback", module = %kind, "Module feedback extracted");
        f
      }
      None => {
        warn!(target: "feedback", module = %kind, reply_len = reply.len(), "Feedback reply missing a section; using static feedback");
        bank::module_fallback(kind, band)
      }
    },
    Err(e) => {
      warn!(target: "feedback", module = %kind, error = %e, "Feedback request failed; using static feedback");
      bank::module_fallback(kind, band)
    }
  }
}

/// One sub-task critique; empty responses and failed requests get the fixed sentence.
pub async fn task_critique(engine: &Engine, task: &WritingTask, response: &str) -> String {
  if response.trim().is_empty() {
    debug!(target: "feedback", task = task.number, "No response to critique");
    return bank::critique_fallback(task.number);
  }
  let prompt = critique_prompt(&engine.prompts, task.number, &task.instructions, response);
  match engine.ask(&prompt).await {
    Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
    Ok(_) => bank::critique_fallback(task.number),
    Err(e) => {
      warn!(target: "feedback", task = task.number, error = %e, "Critique request failed; using fixed sentence");
      bank::critique_fallback(task.number)
    }
  }
}

pub async fn writing_feedback(
  engine: &Engine,
  band: f32,
  responses: &[(&WritingTask, String)],
  context: &str,
) -> WritingFeedback {
  let module = module_feedback(engine, ModuleKind::Writing, band, context).await;
  let mut feedback = WritingFeedback { module, task1_critique: None, task2_critique: None };
  for (task, response) in responses {
    match task.number {
      1 if feedback.task1_critique.is_none() => feedback.task1_critique = Some(task_critique(engine, task, response).await),
      2 if feedback.task2_critique.is_none() => feedback.task2_critique = Some(task_critique(engine, task, response).await),
      _ => {}
    }
  }
  feedback
}

pub async fn overall_feedback(engine: &Engine, scores: &ModuleScores) -> OverallFeedback {
  let prompt = overall_prompt(&engine.prompts, scores);
  match engine.ask(&prompt).await {
    Ok(reply) => parse_overall_feedback(&reply).unwrap_or_else(|| {
      warn!(target: "feedback", reply_len = reply.len(), "Overall feedback not extractable; using study plan");
      bank::overall_fallback(scores.overall)
    }),
    Err(e) => {
      warn!(target: "feedback", error = %e, "Overall feedback request failed; using study plan");
      bank::overall_fallback(scores.overall)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{engine_with, Reply, ScriptedService};

  const GOOD: &str = "Here is my feedback.\n\n**Strengths:**\n- Clear structure\n- Good range of vocabulary\n\nWeaknesses:\n1. Some run-on sentences\n2) Thin conclusion\n\nAdvice: Plan before you write. Then proofread.";

  #[test]
  fn slices_labelled_sections() {
    let f = parse_module_feedback(GOOD).expect("parsed");
    assert_eq!(f.strengths, vec!["Clear structure", "Good range of vocabulary"]);
    assert_eq!(f.weaknesses, vec!["Some run-on sentences", "Thin conclusion"]);
    assert_eq!(f.advice, "Plan before you write.");
    assert_eq!(f.source, FeedbackSource::Generated);
  }

  #[test]
  fn missing_section_discards_the_whole_reply() {
    assert!(parse_module_feedback("Strengths:\n- Clear\nAdvice: Practise.").is_none());
    assert!(parse_module_feedback("Strengths:\n- Clear\nWeaknesses:\nAdvice: Practise.").is_none());
  }

  #[test]
  fn overall_sections() {
    let o = parse_overall_feedback("Summary: Good progress overall. Keep going.\nNext steps:\n1. Read daily\n2. Write weekly")
      .expect("parsed");
    assert_eq!(o.summary, "Good progress overall.");
    assert_eq!(o.next_steps, vec!["Read daily", "Write weekly"]);
  }

  #[test]
  fn lists_are_capped() {
    let body = (1..=8).map(|i| format!("- item {i}")).collect::<Vec<_>>().join("\n");
    assert_eq!(split_items(&body).len(), 5);
  }

  #[tokio::test]
  async fn partial_reply_gets_static_feedback_for_its_tier() {
    let service = ScriptedService::new(vec![("Strengths:", Reply::Chat("Strengths:\n- Quick\n".into()))]);
    let f = module_feedback(&engine_with(&service), ModuleKind::Reading, 7.5, "").await;
    assert_eq!(f, bank::module_fallback(ModuleKind::Reading, 7.5));
  }

  #[tokio::test]
  async fn critiques_fall_back_independently() {
    let service = ScriptedService::new(vec![
      ("Task 1 instructions", Reply::Chat("Covers the main trends well.".into())),
      ("Task 2 instructions", Reply::Timeout),
    ]);
    let engine = engine_with(&service);
    let t1 = WritingTask { number: 1, instructions: "Describe.".into(), min_words: None };
    let t2 = WritingTask { number: 2, instructions: "Discuss.".into(), min_words: None };
    let responses = vec![(&t1, "The chart shows growth.".to_string()), (&t2, "People disagree.".to_string())];

    let f = writing_feedback(&engine, 6.0, &responses, "").await;
    assert_eq!(f.task1_critique.as_deref(), Some("Covers the main trends well."));
    assert_eq!(f.task2_critique, Some(bank::critique_fallback(2)));
    assert_eq!(f.module.source, FeedbackSource::Fallback);
  }

  #[tokio::test]
  async fn overall_falls_back_to_the_study_plan() {
    let service = ScriptedService::new(vec![]);
    let scores = ModuleScores { reading: Some(6.0), overall: Some(6.0), ..Default::default() };
    let o = overall_feedback(&engine_with(&service), &scores).await;
    assert_eq!(o.next_steps.len(), 5);
    assert_eq!(o.source, FeedbackSource::Fallback);
  }
}
