//! Generative-text service boundary.
//!
//! `TextService` is the opaque collaborator: one prompt in, raw reply text out.
//! The reply is still wrapped in a provider envelope; `Provider::unwrap_text`
//! is the closed set of adapters that peel it.
//!
//! NOTE: We never log the API key or prompt/reply contents, only sizes and latencies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::error::RequestError;

/// `(prompt) -> Result<raw, RequestError>`.
#[async_trait]
pub trait TextService: Send + Sync {
  async fn request(&self, prompt: &str) -> Result<String, RequestError>;
}

/// Which envelope shape the service answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
  /// `choices[0].message.content`
  OpenAi,
  /// `candidates[0]` with `content.parts`, flat `parts`, or `text`
  Gemini,
  /// `generations[0].text`
  Cohere,
  /// Reply body is the text itself.
  PlainText,
}

impl Provider {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "openai" | "chat" => Some(Provider::OpenAi),
      "gemini" | "google" => Some(Provider::Gemini),
      "cohere" => Some(Provider::Cohere),
      "plain" | "text" => Some(Provider::PlainText),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Provider::OpenAi => "openai",
      Provider::Gemini => "gemini",
      Provider::Cohere => "cohere",
      Provider::PlainText => "plain",
    }
  }

  fn default_base_url(self) -> &'static str {
    match self {
      Provider::OpenAi => "https://api.openai.com/v1",
      Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
      Provider::Cohere => "https://api.cohere.ai/v1",
      Provider::PlainText => "http://127.0.0.1:8080/generate",
    }
  }

  fn default_model(self) -> &'static str {
    match self {
      Provider::OpenAi => "gpt-4o-mini",
      Provider::Gemini => "gemini-1.5-flash",
      Provider::Cohere => "command",
      Provider::PlainText => "",
    }
  }

  /// Extract the generated text from a raw reply body.
  pub fn unwrap_text(self, raw: &str) -> Result<String, RequestError> {
    let text = match self {
      Provider::PlainText => raw.to_string(),
      _ => {
        let body: Value = serde_json::from_str(raw).map_err(|e| self.envelope_error(format!("reply is not JSON: {e}")))?;
        match self {
          Provider::OpenAi => openai_text(&body),
          Provider::Gemini => gemini_text(&body),
          Provider::Cohere => cohere_text(&body),
          Provider::PlainText => None,
        }
        .ok_or_else(|| self.envelope_error(format!("no text at the expected path (keys: {})", top_keys(&body))))?
      }
    };

    if text.trim().is_empty() {
      return Err(RequestError::EmptyReply);
    }
    Ok(text)
  }

  fn envelope_error(self, detail: String) -> RequestError {
    RequestError::Envelope { provider: self.name(), detail }
  }
}

fn top_keys(v: &Value) -> String {
  v.as_object()
    .map(|m| m.keys().cloned().collect::<Vec<_>>().join(", "))
    .unwrap_or_else(|| "none".into())
}

fn openai_text(body: &Value) -> Option<String> {
  let choice = body.get("choices")?.get(0)?;
  choice
    .pointer("/message/content")
    .or_else(|| choice.get("text"))
    .and_then(Value::as_str)
    .map(str::to_string)
}

fn joined_parts(parts: &Value) -> Option<String> {
  let texts: Vec<&str> = parts.as_array()?.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
  (!texts.is_empty()).then(|| texts.concat())
}

fn gemini_text(body: &Value) -> Option<String> {
  let candidate = body.get("candidates")?.get(0)?;
  candidate
    .pointer("/content/parts")
    .and_then(joined_parts)
    .or_else(|| candidate.get("parts").and_then(joined_parts))
    .or_else(|| candidate.get("text").and_then(Value::as_str).map(str::to_string))
}

fn cohere_text(body: &Value) -> Option<String> {
  body
    .get("generations")
    .and_then(|g| g.get(0))
    .and_then(|g| g.get("text"))
    .or_else(|| body.get("text"))
    .and_then(Value::as_str)
    .map(str::to_string)
}

/// HTTP client for the configured provider.
#[derive(Clone)]
pub struct HttpTextService {
  pub client: reqwest::Client,
  pub provider: Provider,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl HttpTextService {
  /// Construct the client if we find LLM_API_KEY; otherwise return None.
  pub fn from_env(provider: Provider) -> Option<Self> {
    let api_key = std::env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| provider.default_base_url().into());
    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| provider.default_model().into());
    let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(30);

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "bandwise", error = %e, "Failed to build HTTP client");
        return None;
      }
    };

    Some(Self { client, provider, api_key, base_url, model })
  }

  fn build_request(&self, prompt: &str) -> reqwest::RequestBuilder {
    let base = self.base_url.trim_end_matches('/');
    let (url, body) = match self.provider {
      Provider::OpenAi => (
        format!("{base}/chat/completions"),
        json!({
          "model": self.model,
          "messages": [{"role": "user", "content": prompt}],
          "temperature": 0.4,
        }),
      ),
      Provider::Gemini => (
        format!("{base}/models/{}:generateContent", self.model),
        json!({"contents": [{"parts": [{"text": prompt}]}]}),
      ),
      Provider::Cohere => (
        format!("{base}/generate"),
        json!({"model": self.model, "prompt": prompt, "max_tokens": 4000}),
      ),
      Provider::PlainText => (base.to_string(), json!({"prompt": prompt})),
    };

    let req = self
      .client
      .post(url)
      .header(USER_AGENT, "bandwise-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body);
    match self.provider {
      Provider::Gemini => req.header("x-goog-api-key", &self.api_key),
      _ => req.header(AUTHORIZATION, format!("Bearer {}", self.api_key)),
    }
  }
}

#[async_trait]
impl TextService for HttpTextService {
  #[instrument(level = "info", skip(self, prompt), fields(provider = self.provider.name(), model = %self.model, prompt_len = prompt.len()))]
  async fn request(&self, prompt: &str) -> Result<String, RequestError> {
    let start = Instant::now();
    let res = self.build_request(prompt).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_error_message(&body).unwrap_or(body);
      error!(target: "bandwise", status, elapsed = ?start.elapsed(), "Text service returned an error status");
      return Err(RequestError::Http { status, message });
    }

    let raw = res.text().await?;
    info!(target: "bandwise", elapsed = ?start.elapsed(), reply_len = raw.len(), "Text service reply received");
    Ok(raw)
  }
}

/// Try to extract a clean error message from a provider error body.
fn extract_error_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum EBody {
    Nested { error: EObj },
    Flat { error: String },
    Message { message: String },
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  match serde_json::from_str::<EBody>(body).ok()? {
    EBody::Nested { error } => Some(error.message),
    EBody::Flat { error } => Some(error),
    EBody::Message { message } => Some(message),
  }
}

/// Used when no API key is configured. Every request fails, so synthesis
/// reports a request-stage error and evaluation runs on fallbacks.
#[derive(Clone, Debug, Default)]
pub struct OfflineService;

#[async_trait]
impl TextService for OfflineService {
  async fn request(&self, _prompt: &str) -> Result<String, RequestError> {
    Err(RequestError::Unavailable("no LLM_API_KEY configured".into()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unwraps_chat_choices() {
    let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}],"usage":{}}"#;
    assert_eq!(Provider::OpenAi.unwrap_text(raw).expect("text"), "hello");
  }

  #[test]
  fn unwraps_candidates_in_all_three_layouts() {
    let nested = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
    let flat = r#"{"candidates":[{"parts":[{"text":"c"}]}]}"#;
    let text = r#"{"candidates":[{"text":"d"}]}"#;
    assert_eq!(Provider::Gemini.unwrap_text(nested).expect("nested"), "ab");
    assert_eq!(Provider::Gemini.unwrap_text(flat).expect("flat"), "c");
    assert_eq!(Provider::Gemini.unwrap_text(text).expect("text"), "d");
  }

  #[test]
  fn unwraps_generations() {
    let raw = r#"{"id":"x","generations":[{"id":"g","text":" band 7 "}]}"#;
    assert_eq!(Provider::Cohere.unwrap_text(raw).expect("text"), " band 7 ");
  }

  #[test]
  fn wrong_envelope_is_an_envelope_error() {
    let err = Provider::OpenAi.unwrap_text(r#"{"generations":[]}"#).expect_err("wrong shape");
    assert!(matches!(err, RequestError::Envelope { provider: "openai", .. }));
    let err = Provider::Cohere.unwrap_text("not json").expect_err("not json");
    assert!(matches!(err, RequestError::Envelope { provider: "cohere", .. }));
  }

  #[test]
  fn blank_text_is_an_empty_reply() {
    assert!(matches!(Provider::PlainText.unwrap_text("  \n"), Err(RequestError::EmptyReply)));
    assert!(matches!(
      Provider::OpenAi.unwrap_text(r#"{"choices":[{"message":{"content":""}}]}"#),
      Err(RequestError::EmptyReply)
    ));
  }

  #[test]
  fn provider_error_bodies_are_condensed() {
    assert_eq!(extract_error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(), Some("bad key"));
    assert_eq!(extract_error_message(r#"{"message":"quota"}"#).as_deref(), Some("quota"));
    assert_eq!(extract_error_message("<html>"), None);
  }

  #[tokio::test]
  async fn offline_service_is_unavailable() {
    let err = OfflineService.request("anything").await.expect_err("offline");
    assert!(matches!(err, RequestError::Unavailable(_)));
  }
}
