//! Content Synthesizer: prompt → service → envelope → recovery → validation.
//!
//! Any failing stage ends the call with a `GenerationError` naming it; a
//! partially recovered document is never returned.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ExamDocument, ExamVariant, RequestedModules};
use crate::engine::Engine;
use crate::error::{GenerationError, ValidationError};
use crate::prompts::generation_prompt;
use crate::recovery::recover;
use crate::validate::into_document;

#[instrument(
  level = "info",
  target = "synthesis",
  skip_all,
  fields(request_id = %Uuid::new_v4(), variant = variant.label(), modules = ?requested.kinds())
)]
pub async fn synthesize_content(
  engine: &Engine,
  variant: ExamVariant,
  requested: &RequestedModules,
) -> Result<ExamDocument, GenerationError> {
  if requested.is_empty() {
    return Err(ValidationError::NothingRequested.into());
  }

  let prompt = generation_prompt(&engine.prompts, variant, requested);
  let text = engine.ask(&prompt).await.map_err(|e| {
    warn!(target: "synthesis", error = %e, "Generation request failed");
    GenerationError::from(e)
  })?;

  let candidate = recover(&text)?;
  let mut doc = into_document(&candidate, requested).map_err(|e| {
    warn!(target: "synthesis", error = %e, "Recovered content failed validation");
    GenerationError::from(e)
  })?;

  for kind in doc.normalize_question_ids() {
    warn!(target: "synthesis", module = %kind, "Question ids were not contiguous; renumbered in generation order");
  }

  info!(target: "synthesis", modules = ?doc.modules(), reply_len = text.len(), "Exam content synthesized");
  Ok(doc)
}
