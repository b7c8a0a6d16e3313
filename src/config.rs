//! Loading agent configuration (prompt templates + scoring policy) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `ScoringPolicy` for the expected schema.
//! Every field has a compiled-in default, so a partial file only overrides
//! what it names.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub scoring: ScoringPolicy,
}

/// Prompt templates sent to the generative-text service.
/// Placeholders use `{name}` and are filled by `crate::prompts`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Exam generation
  pub generation_system: String,
  pub generation_user_template: String,
  // Subjective band estimates
  pub writing_eval_system: String,
  pub writing_eval_user_template: String,
  pub speaking_eval_system: String,
  pub speaking_eval_user_template: String,
  // Feedback
  pub feedback_system: String,
  pub feedback_user_template: String,
  pub critique_system: String,
  pub critique_user_template: String,
  pub overall_system: String,
  pub overall_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an exam content generator for a band-scored English proficiency test (0-9 bands). Respond ONLY with strict JSON.".into(),
      generation_user_template: "Create a {variant} practice exam containing ONLY these modules: {modules}.\n{module_guidance}\nReturn ONLY one JSON object. No markdown fences, no commentary before or after it.\nUse exactly this shape (values are illustrative):\n{example_shape}\nRules:\n- Question ids are integers starting at 1 and increasing by one across the whole module.\n- \"answer\" is a string, or an array of strings for multi-part answers.\n- Do not include keys for modules that were not requested.".into(),
      writing_eval_system: "You are a certified examiner for the writing module of a 0-9 band English test. Be strict and concise.".into(),
      writing_eval_user_template: "Exam variant: {variant}\n\nTask 1 instructions:\n{task1_instructions}\nTask 1 response ({task1_words} words):\n{task1_response}\n\nTask 2 instructions:\n{task2_instructions}\nTask 2 response ({task2_words} words):\n{task2_response}\n\nRate each task on the 0-9 band scale in 0.5 steps. Task 2 counts twice as much as Task 1.\nReply in exactly this format:\nTask 1: <band>\nTask 2: <band>\nOverall: <band>".into(),
      speaking_eval_system: "You are a certified examiner for the speaking module of a 0-9 band English test. You judge from transcripts.".into(),
      speaking_eval_user_template: "Exam variant: {variant}\n\nTranscribed answers by part:\n{parts}\n\nRate fluency, lexical resource, grammar and coherence together on the 0-9 band scale in 0.5 steps.\nReply in exactly this format:\nOverall: <band>".into(),
      feedback_system: "You are an encouraging but honest exam tutor. Keep every point short and specific.".into(),
      feedback_user_template: "Module: {module}\nBand achieved: {band}\n{context}\n\nWrite feedback using exactly these labelled sections:\nStrengths:\n- <2-3 bullet points>\nWeaknesses:\n- <2-3 bullet points>\nAdvice:\n<one sentence>".into(),
      critique_system: "You are a writing examiner. Answer in two or three sentences of plain text.".into(),
      critique_user_template: "Task {task_number} instructions:\n{instructions}\n\nCandidate response:\n{response}\n\nGive a short critique of how well this response fulfils the task.".into(),
      overall_system: "You are an exam study coach. Keep it practical.".into(),
      overall_user_template: "Band scores: {scores}\n\nWrite an overall assessment using exactly these labelled sections:\nSummary:\n<one sentence>\nNext steps:\n1. <step>\n2. <step>\n3. <step>".into(),
    }
  }
}

/// One row of the percentage-to-band table.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct BandStep {
  pub min_percent: f64,
  pub band: f32,
}

/// Thresholds used by the word-count heuristic for subjective modules.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LengthHeuristic {
  /// Band for a response that meets the minimum length.
  pub base_band_met: f32,
  /// Band for a response below the minimum.
  pub base_band_short: f32,
  /// At or above `long_ratio` × minimum, add `long_bonus`.
  pub long_ratio: f32,
  pub long_bonus: f32,
  /// Below `very_short_ratio` × minimum, subtract `very_short_penalty`.
  pub very_short_ratio: f32,
  pub very_short_penalty: f32,
  /// Distinct punctuation marks needed for `punctuation_bonus`.
  pub punctuation_min_kinds: usize,
  pub punctuation_bonus: f32,
  /// Distinct cohesive devices needed for `cohesion_bonus`.
  pub cohesion_min_devices: usize,
  pub cohesion_bonus: f32,
}

impl Default for LengthHeuristic {
  fn default() -> Self {
    Self {
      base_band_met: 6.0,
      base_band_short: 5.0,
      long_ratio: 1.3,
      long_bonus: 0.5,
      very_short_ratio: 0.5,
      very_short_penalty: 1.5,
      punctuation_min_kinds: 3,
      punctuation_bonus: 0.5,
      cohesion_min_devices: 3,
      cohesion_bonus: 0.5,
    }
  }
}

/// Scoring constants. They approximate an external standard, so they are
/// data, not code.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
  /// Descending `min_percent`; the first row the percentage reaches wins.
  pub band_table: Vec<BandStep>,
  pub heuristic: LengthHeuristic,
  pub writing_task1_min_words: usize,
  pub writing_task2_min_words: usize,
  pub speaking_min_words: usize,
  /// Speaking band when there is no text to judge at all.
  pub speaking_neutral_band: f32,
  pub cohesive_devices: Vec<String>,
}

impl Default for ScoringPolicy {
  fn default() -> Self {
    Self {
      band_table: default_band_table(),
      heuristic: LengthHeuristic::default(),
      writing_task1_min_words: 150,
      writing_task2_min_words: 250,
      speaking_min_words: 120,
      speaking_neutral_band: 5.0,
      cohesive_devices: [
        "however", "moreover", "furthermore", "therefore", "consequently", "in addition",
        "on the other hand", "for example", "for instance", "in contrast", "although",
        "nevertheless", "as a result", "in conclusion", "firstly", "secondly", "finally",
        "whereas", "similarly", "overall",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
    }
  }
}

/// Fifteen bands, compressed at both ends.
pub fn default_band_table() -> Vec<BandStep> {
  [
    (90.0, 9.0),
    (85.0, 8.5),
    (81.0, 8.0),
    (78.0, 7.5),
    (70.0, 7.0),
    (63.0, 6.5),
    (55.0, 6.0),
    (48.0, 5.5),
    (40.0, 5.0),
    (33.0, 4.5),
    (25.0, 4.0),
    (18.0, 3.5),
    (10.0, 3.0),
    (4.0, 2.0),
    (0.0, 1.0),
  ]
  .iter()
  .map(|&(min_percent, band)| BandStep { min_percent, band })
  .collect()
}

impl ScoringPolicy {
  /// Replace an unusable band table with the default one.
  pub fn sanitized(mut self) -> Self {
    if let Err(reason) = check_band_table(&self.band_table) {
      error!(target: "bandwise", %reason, "Invalid band table in config; using default table");
      self.band_table = default_band_table();
    }
    if !(0.0..=9.0).contains(&self.speaking_neutral_band) {
      warn!(target: "bandwise", band = self.speaking_neutral_band, "speaking_neutral_band out of range; clamping");
      self.speaking_neutral_band = self.speaking_neutral_band.clamp(0.0, 9.0);
    }
    self
  }
}

fn check_band_table(table: &[BandStep]) -> Result<(), String> {
  if table.is_empty() {
    return Err("table is empty".into());
  }
  for pair in table.windows(2) {
    if pair[1].min_percent >= pair[0].min_percent {
      return Err(format!("min_percent must strictly decrease ({} then {})", pair[0].min_percent, pair[1].min_percent));
    }
    if pair[1].band > pair[0].band {
      return Err(format!("bands must not increase ({} then {})", pair[0].band, pair[1].band));
    }
  }
  if table.iter().any(|s| !(0.0..=9.0).contains(&s.band)) {
    return Err("bands must lie within [0, 9]".into());
  }
  if table.last().map_or(true, |s| s.min_percent > 0.0) {
    return Err("last row must cover 0%".into());
  }
  Ok(())
}

/// Parse a TOML document into `AgentConfig`, sanitizing the scoring policy.
pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  let mut cfg = toml::from_str::<AgentConfig>(s)?;
  cfg.scoring = cfg.scoring.sanitized();
  Ok(cfg)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "bandwise", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "bandwise", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "bandwise", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_table_has_fifteen_descending_rows() {
    let table = default_band_table();
    assert_eq!(table.len(), 15);
    assert!(check_band_table(&table).is_ok());
  }

  #[test]
  fn partial_toml_overrides_only_named_fields() {
    let cfg = parse_agent_config(
      r#"
      [prompts]
      feedback_system = "Be brief."

      [scoring]
      writing_task2_min_words = 300

      [scoring.heuristic]
      long_bonus = 1.0
      "#,
    )
    .expect("config");
    assert_eq!(cfg.prompts.feedback_system, "Be brief.");
    assert_eq!(cfg.prompts.generation_system, Prompts::default().generation_system);
    assert_eq!(cfg.scoring.writing_task2_min_words, 300);
    assert_eq!(cfg.scoring.writing_task1_min_words, 150);
    assert_eq!(cfg.scoring.heuristic.long_bonus, 1.0);
    assert_eq!(cfg.scoring.heuristic.base_band_met, 6.0);
  }

  #[test]
  fn custom_band_table_is_accepted() {
    let cfg = parse_agent_config(
      r#"
      [scoring]
      band_table = [
        { min_percent = 50.0, band = 6.0 },
        { min_percent = 0.0, band = 3.0 },
      ]
      "#,
    )
    .expect("config");
    assert_eq!(cfg.scoring.band_table.len(), 2);
  }

  #[test]
  fn non_monotonic_band_table_falls_back_to_default() {
    let cfg = parse_agent_config(
      r#"
      [scoring]
      band_table = [
        { min_percent = 10.0, band = 6.0 },
        { min_percent = 50.0, band = 3.0 },
      ]
      "#,
    )
    .expect("config");
    assert_eq!(cfg.scoring.band_table, default_band_table());
  }
}
