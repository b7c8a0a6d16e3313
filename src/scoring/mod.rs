//! Module evaluators, answer comparison and band conversion.

pub mod band;
pub mod comparator;
pub mod objective;
pub mod subjective;

pub use band::{band_for, band_for_percent, overall};
pub use comparator::answers_match;
pub use objective::{score_objective, Tally};
pub use subjective::{score_speaking, score_writing, ScoreSource, SubjectiveScore};
