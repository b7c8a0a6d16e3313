//! Bandwise · exam content recovery and band scoring.
//!
//! Two entry points:
//!   - `synthesize_content`: ask the text service for an exam, recover and
//!     validate it into a typed `ExamDocument`.
//!   - `evaluate`: score submitted answers on the 0-9 band scale and attach
//!     feedback. Never fails; service outages degrade to local fallbacks.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod feedback;
pub mod llm;
pub mod prompts;
pub mod recovery;
pub mod scoring;
pub mod synthesis;
pub mod util;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::Engine;
pub use error::{GenerationError, GenerationStage, RecoveryError, RequestError, ValidationError};
pub use evaluation::evaluate;
pub use synthesis::synthesize_content;
