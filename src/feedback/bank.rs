//! Built-in feedback used whenever the text service is unavailable or its
//! reply cannot be sliced into the labelled sections.

use crate::domain::{FeedbackSource, ModuleFeedback, ModuleKind, OverallFeedback};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
  Low,
  Middle,
  High,
}

impl Tier {
  /// High at 7 and above, low at 4 and below.
  pub fn of(band: f32) -> Self {
    if band >= 7.0 {
      Tier::High
    } else if band <= 4.0 {
      Tier::Low
    } else {
      Tier::Middle
    }
  }
}

struct Entry {
  strengths: &'static [&'static str],
  weaknesses: &'static [&'static str],
  advice: &'static str,
}

fn entry(kind: ModuleKind, tier: Tier) -> Entry {
  use ModuleKind::*;
  use Tier::*;
  match (kind, tier) {
    (Reading, High) => Entry {
      strengths: &["Locates specific information quickly", "Handles inference and writer's-view questions well"],
      weaknesses: &["Occasional slips on paraphrased distractors", "Time can run short on the final passage"],
      advice: "Keep timing each passage to 20 minutes and review every wrong answer against the exact line in the text.",
    },
    (Reading, Middle) => Entry {
      strengths: &["Understands the main ideas of each passage", "Answers direct detail questions reliably"],
      weaknesses: &["True/False/Not Given distinctions are inconsistent", "Synonyms and paraphrase are often missed"],
      advice: "Practise skimming for structure first, then scan for keywords and their synonyms before answering.",
    },
    (Reading, Low) => Entry {
      strengths: &["Attempts every question type", "Picks up familiar topic vocabulary"],
      weaknesses: &["Main ideas of longer passages are not yet clear", "Many answers do not match the wording of the text"],
      advice: "Read one short article a day and summarise each paragraph in a single sentence to build comprehension.",
    },
    (Listening, High) => Entry {
      strengths: &["Follows fast, natural speech across accents", "Spelling of dictated names and numbers is accurate"],
      weaknesses: &["Distractors that are corrected later can still catch you", "Concentration dips in the final section"],
      advice: "Practise with lecture-style recordings and listen for signposting that changes a speaker's first answer.",
    },
    (Listening, Middle) => Entry {
      strengths: &["Handles everyday conversations well", "Predicts the type of answer needed from the question"],
      weaknesses: &["Misses details when speakers talk quickly", "Loses place between questions in longer sections"],
      advice: "Read ahead during pauses and underline the keyword you are waiting to hear in each question.",
    },
    (Listening, Low) => Entry {
      strengths: &["Catches some key words and numbers", "Completes simple form-filling questions"],
      weaknesses: &["Struggles to follow speech at natural speed", "Spelling errors cost otherwise correct answers"],
      advice: "Listen to short podcasts daily with the transcript, then again without it, noting words you missed.",
    },
    (Writing, High) => Entry {
      strengths: &["Ideas are well developed and clearly organised", "Wide, accurate range of vocabulary and structures"],
      weaknesses: &["Occasional overgeneralised claims", "A few less natural collocations"],
      advice: "Sharpen each body paragraph around one precise claim supported by a concrete example.",
    },
    (Writing, Middle) => Entry {
      strengths: &["Responses address the task and reach the word count", "Paragraphing gives a clear overall structure"],
      weaknesses: &["Ideas are listed rather than developed", "Grammar errors appear in complex sentences"],
      advice: "Plan for five minutes before writing and give every main idea an explanation and an example.",
    },
    (Writing, Low) => Entry {
      strengths: &["Attempts to answer the question", "Some relevant vocabulary is used"],
      weaknesses: &["Responses are too short or off task", "Frequent errors make meaning hard to follow"],
      advice: "Practise writing one clear paragraph a day with a topic sentence, a reason and an example.",
    },
    (Speaking, High) => Entry {
      strengths: &["Speaks fluently with little hesitation", "Uses idiomatic language naturally"],
      weaknesses: &["Some answers run long without a clear point", "Minor slips in complex tenses"],
      advice: "Keep answers focused by stating your point first and then extending it with one example.",
    },
    (Speaking, Middle) => Entry {
      strengths: &["Keeps talking and answers every question", "Uses a fair range of everyday vocabulary"],
      weaknesses: &["Noticeable pauses while searching for words", "Relies on simple sentence structures"],
      advice: "Record yourself answering part 2 cue cards for two minutes and replay it to spot repeated words.",
    },
    (Speaking, Low) => Entry {
      strengths: &["Responds to familiar questions", "Basic meaning is usually communicated"],
      weaknesses: &["Answers are very short", "Limited vocabulary restricts what can be expressed"],
      advice: "Practise extending every answer with a reason and an example, aiming for at least three sentences.",
    },
  }
}

pub fn module_fallback(kind: ModuleKind, band: f32) -> ModuleFeedback {
  let e = entry(kind, Tier::of(band));
  ModuleFeedback {
    strengths: e.strengths.iter().map(|s| s.to_string()).collect(),
    weaknesses: e.weaknesses.iter().map(|s| s.to_string()).collect(),
    advice: e.advice.to_string(),
    source: FeedbackSource::Fallback,
  }
}

pub fn critique_fallback(task_number: u8) -> String {
  match task_number {
    1 => "Check that Task 1 covers every key feature or point in the prompt and stays within a clear overview.".into(),
    _ => "Check that Task 2 gives a clear position, develops each idea with support and ends with a conclusion.".into(),
  }
}

/// Generic plan used when overall feedback cannot be extracted.
pub const STUDY_PLAN: [&str; 5] = [
  "Take one timed practice test each week and log your score per module.",
  "Review every incorrect objective answer against the passage or transcript.",
  "Write one Task 2 essay a week and compare it with a high-band model answer.",
  "Speak for two minutes daily on a cue card topic and record yourself.",
  "Build a vocabulary notebook of topic words with example sentences.",
];

pub fn overall_fallback(overall: Option<f32>) -> OverallFeedback {
  let summary = match overall.map(Tier::of) {
    Some(Tier::High) => "Strong overall performance; refine the weaker skills to secure a high band.",
    Some(Tier::Middle) => "A solid base with clear room to improve; focused daily practice will raise your band.",
    Some(Tier::Low) => "Build core skills first; steady practice on fundamentals will move your band up.",
    None => "Complete more modules to receive an overall assessment.",
  };
  OverallFeedback {
    summary: summary.to_string(),
    next_steps: STUDY_PLAN.iter().map(|s| s.to_string()).collect(),
    source: FeedbackSource::Fallback,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tiers_split_at_four_and_seven() {
    assert_eq!(Tier::of(7.0), Tier::High);
    assert_eq!(Tier::of(6.5), Tier::Middle);
    assert_eq!(Tier::of(4.5), Tier::Middle);
    assert_eq!(Tier::of(4.0), Tier::Low);
  }

  #[test]
  fn every_entry_is_complete() {
    for kind in ModuleKind::ALL {
      for band in [2.0, 5.5, 8.0] {
        let f = module_fallback(kind, band);
        assert!(!f.strengths.is_empty() && !f.weaknesses.is_empty() && !f.advice.is_empty());
        assert_eq!(f.source, FeedbackSource::Fallback);
      }
    }
  }

  #[test]
  fn overall_fallback_has_five_steps() {
    assert_eq!(overall_fallback(Some(6.0)).next_steps.len(), 5);
  }
}
