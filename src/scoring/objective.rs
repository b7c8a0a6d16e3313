//! Objective module evaluator (reading, listening).

use tracing::debug;

use super::band::band_for;
use super::comparator::answers_match;
use crate::config::BandStep;
use crate::domain::{ExamDocument, ModuleAnswers, ModuleKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
  pub correct: usize,
  pub total: usize,
}

impl Tally {
  pub fn percent(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.correct as f64 * 100.0 / self.total as f64
    }
  }
}

/// Count correct answers, looked up by question identity. Missing = incorrect.
pub fn tally(doc: &ExamDocument, kind: ModuleKind, answers: Option<&ModuleAnswers>) -> Tally {
  let questions = doc.objective_questions(kind);
  let correct = questions
    .iter()
    .filter(|q| answers_match(answers.and_then(|a| a.get(&q.id.to_string())), &q.answer))
    .count();
  Tally { correct, total: questions.len() }
}

/// Band for an objective module, `None` when it has no questions.
pub fn score_objective(
  doc: &ExamDocument,
  kind: ModuleKind,
  answers: Option<&ModuleAnswers>,
  table: &[BandStep],
) -> Option<(f32, Tally)> {
  let t = tally(doc, kind, answers);
  let band = band_for(table, t.correct, t.total)?;
  debug!(target: "scoring", module = %kind, correct = t.correct, total = t.total, band, "Objective module scored");
  Some((band, t))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::default_band_table;
  use crate::domain::{Answer, Question, QuestionKind, ReadingBody, Passage};

  fn q(id: u32, answer: Answer) -> Question {
    Question { id, kind: QuestionKind::ShortAnswer, text: String::new(), options: None, answer }
  }

  fn doc(questions: Vec<Question>) -> ExamDocument {
    ExamDocument {
      reading: Some(ReadingBody {
        passages: vec![Passage { title: "T".into(), text: "P".into(), questions }],
      }),
      ..Default::default()
    }
  }

  #[test]
  fn answers_are_matched_by_identity_not_position() {
    let d = doc(vec![q(2, Answer::from("b")), q(1, Answer::from("a"))]);
    let answers: ModuleAnswers = [("1".to_string(), Answer::from("A")), ("2".to_string(), Answer::from("b"))].into();
    assert_eq!(tally(&d, ModuleKind::Reading, Some(&answers)), Tally { correct: 2, total: 2 });
  }

  #[test]
  fn unanswered_questions_count_as_wrong() {
    let d = doc(vec![q(1, Answer::from("a")), q(2, Answer::from(vec!["x", "y"]))]);
    let answers: ModuleAnswers = [("2".to_string(), Answer::from(vec!["X", "y "]))].into();
    let (band, t) = score_objective(&d, ModuleKind::Reading, Some(&answers), &default_band_table()).expect("scored");
    assert_eq!(t, Tally { correct: 1, total: 2 });
    assert_eq!(band, 5.5);
  }

  #[test]
  fn no_answers_at_all_is_the_floor_band() {
    let d = doc(vec![q(1, Answer::from("a"))]);
    let (band, _) = score_objective(&d, ModuleKind::Reading, None, &default_band_table()).expect("scored");
    assert_eq!(band, 1.0);
  }

  #[test]
  fn module_without_questions_has_no_score() {
    assert!(score_objective(&doc(vec![]), ModuleKind::Reading, None, &default_band_table()).is_none());
    assert!(score_objective(&ExamDocument::default(), ModuleKind::Listening, None, &default_band_table()).is_none());
  }
}
