//! Evaluation Orchestrator.
//!
//! Total by construction: every text-service failure inside is absorbed by a
//! fallback, so callers always get scores and feedback back.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{AnswerMap, EvaluationReport, ExamDocument, ExamVariant, FeedbackBundle, ModuleKind, ModuleScores};
use crate::engine::Engine;
use crate::feedback::{module_feedback, overall_feedback, writing_feedback};
use crate::scoring::subjective::{speaking_transcripts, writing_responses};
use crate::scoring::{overall, score_objective, score_speaking, score_writing};
use crate::util::word_count;

#[instrument(
  level = "info",
  target = "scoring",
  skip_all,
  fields(request_id = %Uuid::new_v4(), variant = variant.label(), modules = ?doc.modules())
)]
pub async fn evaluate(engine: &Engine, doc: &ExamDocument, answers: &AnswerMap, variant: ExamVariant) -> EvaluationReport {
  // Caller documents may omit task and part numbers; answers key on them.
  let mut doc = Cow::Borrowed(doc);
  if doc.has_unnumbered_parts() {
    doc.to_mut().fill_part_numbers();
  }
  let doc = doc.as_ref();

  let mut scores = ModuleScores::default();
  let mut contexts: BTreeMap<ModuleKind, String> = BTreeMap::new();

  for kind in doc.modules() {
    let module_answers = answers.get(&kind);
    match kind {
      ModuleKind::Reading | ModuleKind::Listening => {
        if let Some((band, t)) = score_objective(doc, kind, module_answers, &engine.policy.band_table) {
          scores.set(kind, band);
          contexts.insert(kind, format!("Correct answers: {} of {} ({:.1}%).", t.correct, t.total, t.percent()));
        }
      }
      ModuleKind::Writing => {
        if let Some(body) = &doc.writing {
          let s = score_writing(engine, variant, body, module_answers).await;
          scores.set(kind, s.band);
          let words = writing_responses(body, module_answers)
            .iter()
            .map(|(t, r)| format!("task {}: {} words", t.number, word_count(r)))
            .collect::<Vec<_>>()
            .join(", ");
          contexts.insert(kind, format!("Response lengths: {words}."));
        }
      }
      ModuleKind::Speaking => {
        if let Some(body) = &doc.speaking {
          let s = score_speaking(engine, variant, body, module_answers).await;
          scores.set(kind, s.band);
          let answered = speaking_transcripts(body, module_answers).len();
          contexts.insert(kind, format!("Parts with a transcript: {answered} of {}.", body.parts.len()));
        }
      }
    }
  }
  scores.overall = overall(&scores);

  let mut feedback = FeedbackBundle::default();
  for (kind, band) in scores.present() {
    let context = contexts.get(&kind).map(String::as_str).unwrap_or_default();
    match kind {
      ModuleKind::Writing => {
        if let Some(body) = &doc.writing {
          let responses = writing_responses(body, answers.get(&kind));
          feedback.writing = Some(writing_feedback(engine, band, &responses, context).await);
        }
      }
      ModuleKind::Reading => feedback.reading = Some(module_feedback(engine, kind, band, context).await),
      ModuleKind::Listening => feedback.listening = Some(module_feedback(engine, kind, band, context).await),
      ModuleKind::Speaking => feedback.speaking = Some(module_feedback(engine, kind, band, context).await),
    }
  }
  if scores.overall.is_some() {
    feedback.overall = Some(overall_feedback(engine, &scores).await);
  }

  info!(target: "scoring", overall = ?scores.overall, modules = scores.present().len(), "Evaluation complete");
  EvaluationReport { scores, feedback }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Answer, FeedbackSource, ModuleAnswers, RequestedModules, WritingBody, WritingTask};
  use crate::testing::{engine_with, reading_module_json, Reply, ScriptedService};
  use crate::validate::into_document;

  fn reading_doc(n: u32) -> ExamDocument {
    let candidate: serde_json::Value =
      serde_json::from_str(&format!("{{\"reading\": {}}}", reading_module_json(n))).expect("json");
    into_document(&candidate, &RequestedModules::only(ModuleKind::Reading)).expect("document")
  }

  #[tokio::test]
  async fn ten_of_thirteen_reading_is_band_seven() {
    let service = ScriptedService::new(vec![]);
    let doc = reading_doc(13);
    let reading: ModuleAnswers = (1..=13)
      .map(|i| {
        let a = if i <= 10 { format!("Answer{i} ") } else { "wrong".to_string() };
        (i.to_string(), Answer::One(a))
      })
      .collect();
    let answers: AnswerMap = [(ModuleKind::Reading, reading)].into();

    let report = evaluate(&engine_with(&service), &doc, &answers, ExamVariant::Academic).await;
    assert_eq!(report.scores.reading, Some(7.0));
    assert_eq!(report.scores.overall, report.scores.reading);
    assert!(report.scores.writing.is_none());
    assert!(report.feedback.reading.is_some());
    assert!(report.feedback.writing.is_none());
    assert!(report.feedback.overall.is_some());
  }

  #[tokio::test]
  async fn writing_timeout_still_scores_and_uses_static_feedback() {
    let service = ScriptedService::new(vec![("Rate each task", Reply::Timeout), ("", Reply::Timeout)]);
    let doc = ExamDocument {
      writing: Some(WritingBody {
        tasks: vec![
          WritingTask { number: 1, instructions: "Describe the graph.".into(), min_words: None },
          WritingTask { number: 2, instructions: "Discuss both views.".into(), min_words: None },
        ],
      }),
      ..Default::default()
    };
    let writing: ModuleAnswers = [
      ("1".to_string(), Answer::from("The graph shows a steady rise in sales, however costs fell.")),
      ("2".to_string(), Answer::from("Some people think cities are better; others prefer the countryside.")),
    ]
    .into();
    let answers: AnswerMap = [(ModuleKind::Writing, writing)].into();

    let report = evaluate(&engine_with(&service), &doc, &answers, ExamVariant::Academic).await;
    let band = report.scores.writing.expect("writing score");
    assert!((0.0..=9.0).contains(&band));

    let fb = report.feedback.writing.expect("writing feedback");
    assert_eq!(fb.module.source, FeedbackSource::Fallback);
    assert!(!fb.module.strengths.is_empty());
    assert!(!fb.module.weaknesses.is_empty());
    assert!(!fb.module.advice.is_empty());
    assert_eq!(fb.module.advice.matches(". ").count(), 0);
    assert!(fb.task1_critique.is_some() && fb.task2_critique.is_some());
    assert_eq!(report.feedback.overall.expect("overall").source, FeedbackSource::Fallback);
  }

  #[tokio::test]
  async fn absent_modules_are_not_scored_as_zero() {
    let service = ScriptedService::new(vec![]);
    let mut doc = reading_doc(2);
    doc.writing = Some(WritingBody {
      tasks: vec![WritingTask { number: 1, instructions: "Write.".into(), min_words: None }],
    });
    let reading: ModuleAnswers = [("1".to_string(), Answer::from("answer1")), ("2".to_string(), Answer::from("answer2"))].into();
    let answers: AnswerMap = [(ModuleKind::Reading, reading)].into();

    let report = evaluate(&engine_with(&service), &doc, &answers, ExamVariant::Academic).await;
    assert_eq!(report.scores.reading, Some(9.0));
    // Writing is part of the exam but unanswered, so it scores 0 and counts.
    assert_eq!(report.scores.writing, Some(0.0));
    assert_eq!(report.scores.overall, Some(4.5));
    assert!(report.scores.listening.is_none());
    assert!(report.feedback.listening.is_none());
  }

  #[tokio::test]
  async fn unnumbered_writing_tasks_are_matched_by_position() {
    let service = ScriptedService::new(vec![("Rate each task", Reply::Chat("Overall: 7".into()))]);
    let doc: ExamDocument = serde_json::from_value(serde_json::json!({
      "writing": {"tasks": [{"instructions": "Describe the graph."}, {"instructions": "Discuss both views."}]}
    }))
    .expect("document");
    let writing: ModuleAnswers = [
      ("1".to_string(), Answer::from("The graph shows a steady rise in sales.")),
      ("2".to_string(), Answer::from("Cities offer work, while villages offer calm.")),
    ]
    .into();
    let answers: AnswerMap = [(ModuleKind::Writing, writing)].into();

    let report = evaluate(&engine_with(&service), &doc, &answers, ExamVariant::Academic).await;
    assert_eq!(report.scores.writing, Some(7.0));
    assert!(service.calls() >= 1);
  }

  #[tokio::test]
  async fn empty_document_has_no_overall() {
    let service = ScriptedService::new(vec![]);
    let report = evaluate(&engine_with(&service), &ExamDocument::default(), &AnswerMap::new(), ExamVariant::Academic).await;
    assert_eq!(report.scores, ModuleScores::default());
    assert!(report.feedback.overall.is_none());
    assert_eq!(service.calls(), 0);
  }
}
