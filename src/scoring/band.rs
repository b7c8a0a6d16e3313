//! Band Converter and aggregation.

use crate::config::BandStep;
use crate::domain::ModuleScores;
use crate::util::round_half_up_to_half;

// Tolerates float noise at exact boundaries (e.g. 9/10 * 100).
const EPSILON: f64 = 1e-9;

/// First row whose threshold the percentage reaches. Never interpolates.
pub fn band_for_percent(table: &[BandStep], percent: f64) -> f32 {
  table
    .iter()
    .find(|step| percent + EPSILON >= step.min_percent)
    .or(table.last())
    .map_or(0.0, |step| step.band)
}

/// Band for `correct` out of `total`; `None` when there is nothing to score.
pub fn band_for(table: &[BandStep], correct: usize, total: usize) -> Option<f32> {
  if total == 0 {
    return None;
  }
  Some(band_for_percent(table, correct as f64 * 100.0 / total as f64))
}

/// Mean of the present module scores, half-up to 0.5. Absent modules are
/// excluded, not counted as zero.
pub fn overall(scores: &ModuleScores) -> Option<f32> {
  let present = scores.present();
  if present.is_empty() {
    return None;
  }
  let sum: f32 = present.iter().map(|(_, b)| b).sum();
  Some(round_half_up_to_half(sum / present.len() as f32))
}
