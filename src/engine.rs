//! The handle every synthesis/evaluation call runs against.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{load_agent_config_from_env, AgentConfig, Prompts, ScoringPolicy};
use crate::error::RequestError;
use crate::llm::{HttpTextService, OfflineService, Provider, TextService};

/// Text service + envelope adapter + prompts + scoring policy.
/// Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct Engine {
  service: Arc<dyn TextService>,
  provider: Provider,
  pub prompts: Prompts,
  pub policy: ScoringPolicy,
}

impl Engine {
  pub fn new(service: Arc<dyn TextService>, provider: Provider, config: AgentConfig) -> Self {
    Self { service, provider, prompts: config.prompts, policy: config.scoring.sanitized() }
  }

  /// Build from env: AGENT_CONFIG_PATH, LLM_PROVIDER, LLM_API_KEY and friends.
  pub fn from_env() -> Self {
    let config = load_agent_config_from_env().unwrap_or_default();
    let provider = match std::env::var("LLM_PROVIDER") {
      Ok(s) => Provider::parse(&s).unwrap_or_else(|| {
        warn!(target: "bandwise", value = %s, "Unknown LLM_PROVIDER; using openai");
        Provider::OpenAi
      }),
      Err(_) => Provider::OpenAi,
    };

    let service: Arc<dyn TextService> = match HttpTextService::from_env(provider) {
      Some(http) => {
        info!(target: "bandwise", provider = provider.name(), base_url = %http.base_url, model = %http.model, "Text service enabled.");
        Arc::new(http)
      }
      None => {
        info!(target: "bandwise", "Text service disabled (no LLM_API_KEY). Generation fails; evaluation uses fallbacks.");
        Arc::new(OfflineService)
      }
    };
    Self::new(service, provider, config)
  }

  pub fn provider(&self) -> Provider {
    self.provider
  }

  /// One external call, envelope unwrapped. Never retried.
  pub async fn ask(&self, prompt: &str) -> Result<String, RequestError> {
    let raw = self.service.request(prompt).await?;
    self.provider.unwrap_text(&raw)
  }
}
