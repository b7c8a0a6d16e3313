//! Test doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::AgentConfig;
use crate::engine::Engine;
use crate::error::RequestError;
use crate::llm::{Provider, TextService};

#[derive(Clone, Debug)]
pub(crate) enum Reply {
  /// Wrapped in a chat-completions envelope.
  Chat(String),
  /// Returned verbatim as the reply body.
  Raw(String),
  Timeout,
}

/// Answers by the first rule whose marker occurs in the prompt; no match is
/// an `Unavailable` failure. Counts every call it serves.
pub(crate) struct ScriptedService {
  rules: Vec<(&'static str, Reply)>,
  calls: AtomicUsize,
}

impl ScriptedService {
  pub(crate) fn new(rules: Vec<(&'static str, Reply)>) -> Arc<Self> {
    Arc::new(Self { rules, calls: AtomicUsize::new(0) })
  }

  pub(crate) fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TextService for ScriptedService {
  async fn request(&self, prompt: &str) -> Result<String, RequestError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let reply = self.rules.iter().find(|(marker, _)| prompt.contains(marker)).map(|(_, r)| r.clone());
    match reply {
      Some(Reply::Chat(text)) => Ok(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}).to_string()),
      Some(Reply::Raw(body)) => Ok(body),
      Some(Reply::Timeout) => Err(RequestError::Timeout),
      None => Err(RequestError::Unavailable("no scripted reply".into())),
    }
  }
}

pub(crate) fn engine_with(service: &Arc<ScriptedService>) -> Engine {
  Engine::new(service.clone(), Provider::OpenAi, AgentConfig::default())
}

/// A reading module body with one passage of `n` questions; the answer to
/// question i is `answer{i}`.
pub(crate) fn reading_module_json(n: u32) -> String {
  let questions: Vec<_> = (1..=n)
    .map(|i| json!({"id": i, "type": "short_answer", "question": format!("Question {i}?"), "answer": format!("answer{i}")}))
    .collect();
  json!({"passages": [{"title": "The honeybee", "text": "Bees dance to share where food is.", "questions": questions}]}).to_string()
}
