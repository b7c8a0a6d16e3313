//! Application state shared by the HTTP handlers.
//!
//! Holds only the engine (text service, prompts, scoring policy). Every
//! request works on its own document and answers, so nothing here is mutable.

use bandwise::Engine;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    /// Build state from env: agent config, provider and API key.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let engine = Engine::from_env();
        info!(
            target: "bandwise",
            provider = engine.provider().name(),
            bands = engine.policy.band_table.len(),
            "Engine ready"
        );
        Self::with_engine(engine)
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }
}
