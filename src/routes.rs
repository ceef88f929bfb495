use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    error::PipelineError,
    metadata::GenerationMetadata,
    models::{GenerateRequest, GenerateResponse, UiSpec, SCHEMA_VERSION},
    pipeline::Pipeline,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Generation>>>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { store: Arc::default(), pipeline }
    }
}

/// A stored generation as returned to callers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Generation {
    pub id: Uuid,
    pub spec: UiSpec,
    pub meta: GenerationMetadata,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/generations/:id", get(get_generation))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<Generation>, PipelineError> {
    tracing::info!("🚀 Generating UI spec for prompt: {}", crate::oracle::preview(body.prompt.trim(), 80));
    let GenerateResponse { spec, meta } = state.pipeline.generate(&body).await?;
    let generation = Generation { id: Uuid::new_v4(), spec, meta };
    state.store.write().insert(generation.id, generation.clone());
    tracing::info!("✅ Generation {} stored (score {})", generation.id, generation.meta.linter_score);
    Ok(Json(generation))
}

pub async fn get_generation(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if let Some(g) = state.store.read().get(&id).cloned() {
        Json(g).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "schemaVersion": SCHEMA_VERSION }))
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match self {
            PipelineError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Stage(_) | PipelineError::AllCandidatesFailed { .. } => StatusCode::BAD_GATEWAY,
        };
        tracing::error!("❌ Generation failed: {}", self);
        let body = json!({
            "error": self.to_string(),
            "stage": self.stage(),
            "violations": self.violations(),
        });
        (status, Json(body)).into_response()
    }
}
