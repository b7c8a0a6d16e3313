//! HTTP endpoint handlers. These are thin wrappers that forward to the core.
//! Each handler is instrumented and logs sizes and basic result info.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, instrument};

use bandwise::{evaluate, synthesize_content, GenerationError, ValidationError};

use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(variant = body.variant.label()))]
pub async fn http_post_generate(State(state): State<Arc<AppState>>, Json(body): Json<GenerateIn>) -> Response {
    let requested = body.modules.into_requested();
    match synthesize_content(&state.engine, body.variant, &requested).await {
        Ok(doc) => {
            info!(target: "bandwise", modules = ?doc.modules(), "HTTP exam generated");
            Json(doc).into_response()
        }
        Err(e) => {
            let status = match &e {
                GenerationError::Validation(ValidationError::NothingRequested) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            error!(target: "bandwise", stage = %e.stage(), error = %e, "HTTP exam generation failed");
            (status, Json(GenerationErrorOut { error: e.to_string(), stage: e.stage() })).into_response()
        }
    }
}

#[instrument(level = "info", skip(state, body), fields(modules = ?body.document.modules(), answered = body.answers.len()))]
pub async fn http_post_evaluate(State(state): State<Arc<AppState>>, Json(body): Json<EvaluateIn>) -> impl IntoResponse {
    let report = evaluate(&state.engine, &body.document, &body.answers, body.variant).await;
    info!(target: "bandwise", overall = ?report.scores.overall, "HTTP evaluation served");
    Json(report)
}
