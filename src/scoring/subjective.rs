//! Subjective module evaluator (writing, speaking).
//!
//! Primary path asks the text service for a band; any request failure or a
//! reply without a usable number falls back to a word-count heuristic.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ScoringPolicy;
use crate::domain::{Answer, ExamVariant, ModuleAnswers, SpeakingBody, WritingBody, WritingTask};
use crate::engine::Engine;
use crate::prompts::{speaking_eval_prompt, writing_eval_prompt, TaskResponse};
use crate::util::{round_half_up_to_half, word_count};

static OVERALL_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\boverall\b").expect("overall label regex"));
static BAND_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bband\b").expect("band label regex"));
static TASK_BAND: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\btask\s*([12])\b[^\d\n]{0,24}?(\d+(?:\.\d+)?)").expect("task band regex"));
static ANY_NUMBER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)(\b(?:task|part)\s*)?(\d+(?:\.\d+)?)").expect("number regex"));
static URI_REFERENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("uri regex"));

/// Widest gap allowed between a label and its figure.
const LABEL_GAP_CHARS: usize = 24;

const PUNCTUATION: [char; 10] = ['.', ',', ';', ':', '!', '?', '\'', '"', '(', '-'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreSource {
  /// Band read from the text service reply.
  Estimated,
  /// Word-count heuristic.
  Heuristic,
  /// Speaking with nothing to judge.
  Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubjectiveScore {
  pub band: f32,
  pub source: ScoreSource,
}

fn to_band(x: f32) -> f32 {
  round_half_up_to_half(x.clamp(0.0, 9.0))
}

fn parse_number(s: &str) -> Option<f32> {
  s.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn first_number(reply: &str) -> Option<f32> {
  ANY_NUMBER
    .captures_iter(reply)
    .filter(|c| c.get(1).is_none())
    .find_map(|c| c.get(2).and_then(|m| parse_number(m.as_str())))
}

/// Figure following `label` on the same line. A task or part label met
/// before any figure disqualifies that occurrence.
fn labeled(reply: &str, label: &Regex) -> Option<f32> {
  label.find_iter(reply).find_map(|m| {
    let rest = &reply[m.end()..];
    let c = ANY_NUMBER.captures(rest)?;
    let gap = &rest[..c.get(0)?.start()];
    if c.get(1).is_some() || gap.contains('\n') || gap.chars().count() > LABEL_GAP_CHARS {
      return None;
    }
    parse_number(&c[2])
  })
}

/// "Overall" figure, then "Band" figure, else the first number that is not
/// a task or part label. Clamped to [0, 9] and aligned to 0.5.
pub fn extract_band(reply: &str) -> Option<f32> {
  labeled(reply, &OVERALL_LABEL)
    .or_else(|| labeled(reply, &BAND_LABEL))
    .or_else(|| first_number(reply))
    .map(to_band)
}

/// Like `extract_band`, but two task figures without an overall one combine
/// as (task1 + 2 × task2) / 3 before a bare "Band" figure is considered.
pub fn extract_writing_band(reply: &str) -> Option<f32> {
  if let Some(b) = labeled(reply, &OVERALL_LABEL) {
    return Some(to_band(b));
  }
  let (mut t1, mut t2) = (None, None);
  for c in TASK_BAND.captures_iter(reply) {
    let value = parse_number(&c[2]);
    match &c[1] {
      "1" => t1 = t1.or(value),
      _ => t2 = t2.or(value),
    }
  }
  if let (Some(a), Some(b)) = (t1, t2) {
    return Some(to_band((a.clamp(0.0, 9.0) + 2.0 * b.clamp(0.0, 9.0)) / 3.0));
  }
  labeled(reply, &BAND_LABEL).or_else(|| first_number(reply)).map(to_band)
}

fn punctuation_kinds(text: &str) -> usize {
  PUNCTUATION.iter().filter(|p| text.contains(**p)).count()
}

fn cohesive_devices(text: &str, devices: &[String]) -> usize {
  let words: Vec<String> = text
    .to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(str::to_string)
    .collect();
  let padded = format!(" {} ", words.join(" "));
  devices
    .iter()
    .filter(|d| padded.contains(&format!(" {} ", d.trim().to_lowercase())))
    .count()
}

/// Deterministic band from length, punctuation variety and cohesion.
/// An empty response scores 0.
pub fn heuristic_band(text: &str, min_words: usize, policy: &ScoringPolicy) -> f32 {
  let h = &policy.heuristic;
  let words = word_count(text) as f32;
  if words == 0.0 {
    return 0.0;
  }
  let min = min_words.max(1) as f32;

  let mut band = if words >= min { h.base_band_met } else { h.base_band_short };
  if words >= min * h.long_ratio {
    band += h.long_bonus;
  }
  if words < min * h.very_short_ratio {
    band -= h.very_short_penalty;
  }
  if punctuation_kinds(text) >= h.punctuation_min_kinds {
    band += h.punctuation_bonus;
  }
  if cohesive_devices(text, &policy.cohesive_devices) >= h.cohesion_min_devices {
    band += h.cohesion_bonus;
  }
  to_band(band)
}

fn lookup<'a>(answers: Option<&'a ModuleAnswers>, number: u8, prefix: &str) -> Option<&'a Answer> {
  let answers = answers?;
  answers.get(&number.to_string()).or_else(|| answers.get(&format!("{prefix}{number}")))
}

/// Each writing task with the submitted response (empty when missing).
/// Responses are keyed by task number, `"1"` or `"task1"`.
pub fn writing_responses<'a>(body: &'a WritingBody, answers: Option<&ModuleAnswers>) -> Vec<(&'a WritingTask, String)> {
  body
    .tasks
    .iter()
    .map(|t| (t, lookup(answers, t.number, "task").map(Answer::as_text).unwrap_or_default()))
    .collect()
}

fn min_words_for(task: &WritingTask, policy: &ScoringPolicy) -> usize {
  task.min_words.unwrap_or(if task.number == 1 {
    policy.writing_task1_min_words
  } else {
    policy.writing_task2_min_words
  })
}

/// Opaque recording references (URI scheme, no whitespace) carry no text.
pub fn is_recording_reference(s: &str) -> bool {
  URI_REFERENCE.is_match(s.trim())
}

fn text_proxy(answer: &Answer) -> Option<String> {
  let pieces: Vec<&str> = match answer {
    Answer::One(s) => vec![s.as_str()],
    Answer::Many(v) => v.iter().map(String::as_str).collect(),
  };
  let text: Vec<&str> = pieces
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty() && !is_recording_reference(s))
    .collect();
  (!text.is_empty()).then(|| text.join("\n"))
}

/// Transcripts per speaking part as (number, topic, text); parts with no
/// text proxy are left out. Keyed by part number, `"1"` or `"part1"`.
pub fn speaking_transcripts<'a>(body: &'a SpeakingBody, answers: Option<&ModuleAnswers>) -> Vec<(u8, &'a str, String)> {
  body
    .parts
    .iter()
    .filter_map(|p| {
      let text = lookup(answers, p.number, "part").and_then(text_proxy)?;
      Some((p.number, p.topic.as_str(), text))
    })
    .collect()
}

pub async fn score_writing(
  engine: &Engine,
  variant: ExamVariant,
  body: &WritingBody,
  answers: Option<&ModuleAnswers>,
) -> SubjectiveScore {
  let policy = &engine.policy;
  let responses = writing_responses(body, answers);

  if responses.iter().all(|(_, r)| r.trim().is_empty()) {
    info!(target: "scoring", "No writing responses submitted; heuristic band 0");
    return SubjectiveScore { band: 0.0, source: ScoreSource::Heuristic };
  }

  let task = |n: u8| {
    responses
      .iter()
      .find(|(t, _)| t.number == n)
      .map(|(t, r)| TaskResponse { instructions: &t.instructions, response: r })
      .unwrap_or(TaskResponse { instructions: "", response: "" })
  };
  let prompt = writing_eval_prompt(&engine.prompts, variant, &task(1), &task(2));

  match engine.ask(&prompt).await {
    Ok(reply) => match extract_writing_band(&reply) {
      Some(band) => {
        debug!(target: "scoring", band, "Writing band estimated by text service");
        return SubjectiveScore { band, source: ScoreSource::Estimated };
      }
      None => warn!(target: "scoring", reply_len = reply.len(), "No band in writing evaluation reply; using heuristic"),
    },
    Err(e) => warn!(target: "scoring", error = %e, "Writing evaluation request failed; using heuristic"),
  }

  let per_task: Vec<(u8, f32)> = responses
    .iter()
    .map(|(t, r)| (t.number, heuristic_band(r, min_words_for(t, policy), policy)))
    .collect();
  let b1 = per_task.iter().find(|(n, _)| *n == 1).map(|(_, b)| *b);
  let b2 = per_task.iter().find(|(n, _)| *n == 2).map(|(_, b)| *b);
  let band = match (b1, b2) {
    (Some(a), Some(b)) => to_band((a + 2.0 * b) / 3.0),
    _ => to_band(per_task.iter().map(|(_, b)| b).sum::<f32>() / per_task.len().max(1) as f32),
  };
  info!(target: "scoring", band, "Writing band from heuristic");
  SubjectiveScore { band, source: ScoreSource::Heuristic }
}

pub async fn score_speaking(
  engine: &Engine,
  variant: ExamVariant,
  body: &SpeakingBody,
  answers: Option<&ModuleAnswers>,
) -> SubjectiveScore {
  let policy = &engine.policy;
  let transcripts = speaking_transcripts(body, answers);

  if transcripts.is_empty() {
    info!(target: "scoring", band = policy.speaking_neutral_band, "No speaking transcript; neutral band");
    return SubjectiveScore { band: policy.speaking_neutral_band, source: ScoreSource::Neutral };
  }

  let parts: Vec<(u8, &str, &str)> = transcripts.iter().map(|(n, topic, t)| (*n, *topic, t.as_str())).collect();
  let prompt = speaking_eval_prompt(&engine.prompts, variant, &parts);

  match engine.ask(&prompt).await {
    Ok(reply) => match extract_band(&reply) {
      Some(band) => {
        debug!(target: "scoring", band, "Speaking band estimated by text service");
        return SubjectiveScore { band, source: ScoreSource::Estimated };
      }
      None => warn!(target: "scoring", reply_len = reply.len(), "No band in speaking evaluation reply; using heuristic"),
    },
    Err(e) => warn!(target: "scoring", error = %e, "Speaking evaluation request failed; using heuristic"),
  }

  let joined = transcripts.iter().map(|(_, _, t)| t.as_str()).collect::<Vec<_>>().join("\n");
  let band = heuristic_band(&joined, policy.speaking_min_words, policy);
  info!(target: "scoring", band, "Speaking band from heuristic");
  SubjectiveScore { band, source: ScoreSource::Heuristic }
}
