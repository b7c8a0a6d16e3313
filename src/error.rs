//! Error taxonomy for content synthesis and the text-service boundary.
//!
//! Evaluation has no error type of its own: every `RequestError` raised while
//! scoring or writing feedback is absorbed by a fallback.

use std::fmt;

use thiserror::Error;

use crate::domain::ModuleKind;

/// Failure of one external generative-text request, including replies whose
/// envelope could not be unwrapped.
#[derive(Debug, Error)]
pub enum RequestError {
  #[error("text service unavailable: {0}")]
  Unavailable(String),
  #[error("request timed out")]
  Timeout,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("unexpected {provider} envelope: {detail}")]
  Envelope { provider: &'static str, detail: String },
  #[error("service returned an empty reply")]
  EmptyReply,
}

impl From<reqwest::Error> for RequestError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      RequestError::Timeout
    } else {
      RequestError::Transport(e.to_string())
    }
  }
}

/// Every recovery strategy failed. Keeps the raw text for diagnostics.
#[derive(Debug, Error)]
#[error("content unrecoverable: no strategy produced a JSON object ({} bytes of raw text)", .raw.len())]
pub struct RecoveryError {
  pub raw: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("no modules were requested")]
  NothingRequested,
  #[error("recovered content is not a JSON object")]
  NotAnObject,
  #[error("missing module '{0}'")]
  MissingModule(ModuleKind),
  #[error("malformed module '{module}': {expectation}")]
  MalformedModule { module: ModuleKind, expectation: String },
}

impl ValidationError {
  pub(crate) fn malformed(module: ModuleKind, expectation: impl Into<String>) -> Self {
    ValidationError::MalformedModule { module, expectation: expectation.into() }
  }
}

/// Stage of content synthesis that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
  Request,
  Envelope,
  Recovery,
  Validation,
}

impl fmt::Display for GenerationStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      GenerationStage::Request => "request",
      GenerationStage::Envelope => "envelope",
      GenerationStage::Recovery => "recovery",
      GenerationStage::Validation => "validation",
    };
    f.write_str(s)
  }
}

/// Content synthesis failed; no document is produced.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation failed at {}: {0}", request_stage(.0))]
  Request(#[source] RequestError),
  #[error("generation failed at recovery: {0}")]
  Recovery(#[from] RecoveryError),
  #[error("generation failed at validation: {0}")]
  Validation(#[from] ValidationError),
}

fn request_stage(e: &RequestError) -> GenerationStage {
  match e {
    RequestError::Envelope { .. } => GenerationStage::Envelope,
    _ => GenerationStage::Request,
  }
}

impl GenerationError {
  pub fn stage(&self) -> GenerationStage {
    match self {
      GenerationError::Request(e) => request_stage(e),
      GenerationError::Recovery(_) => GenerationStage::Recovery,
      GenerationError::Validation(_) => GenerationStage::Validation,
    }
  }
}

impl From<RequestError> for GenerationError {
  fn from(e: RequestError) -> Self {
    GenerationError::Request(e)
  }
}
