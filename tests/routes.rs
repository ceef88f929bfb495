use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use uispec_pipeline::config::PipelineConfig;
use uispec_pipeline::demo::DemoOracle;
use uispec_pipeline::events::{Stage, TracingSink};
use uispec_pipeline::oracle::{Oracle, OracleError, OracleRequest};
use uispec_pipeline::pipeline::Pipeline;
use uispec_pipeline::priors::DesignPriors;
use uispec_pipeline::routes::{router, AppState};

/// Demo answers, but theme calls take `delay` and are counted.
struct Slow {
    demo: DemoOracle,
    delay: Duration,
    started: AtomicUsize,
    finished: AtomicUsize,
}

#[async_trait]
impl Oracle for Slow {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        if request.stage == Stage::Theme {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        self.demo.complete(request).await
    }
}

fn state(oracle: Arc<dyn Oracle>) -> AppState {
    let pipeline = Pipeline::new(
        oracle,
        Arc::new(DesignPriors::builtin()),
        PipelineConfig::default(),
        Arc::new(TracingSink),
    );
    AppState::new(Arc::new(pipeline))
}

fn app() -> Router {
    router(state(Arc::new(DemoOracle::new(Arc::new(DesignPriors::builtin())))))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_schema_version() {
    let (status, body) = send(&app(), Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "schemaVersion": "1.0.0"}));
}

#[tokio::test]
async fn generate_then_fetch_by_id() {
    let app = app();
    let (status, created) = send(
        &app,
        post_json("/api/generate", json!({"prompt": "Create a todo app", "options": {"n_candidates": 2}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["meta"]["appType"], "crud");
    assert_eq!(created["meta"]["passes"]["theme"]["requested"], 2);
    assert_eq!(created["spec"]["version"], "1.0.0");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(
        &app,
        Request::get(format!("/api/generations/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn unknown_generation_is_404() {
    let uri = format!("/api/generations/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app(), Request::get(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_prompt_is_unprocessable() {
    let (status, body) = send(&app(), post_json("/api/generate", json!({"prompt": "  "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["stage"], Value::Null);
    assert_eq!(body["violations"], json!(["prompt must not be empty"]));
}

#[tokio::test]
async fn dropped_request_aborts_candidates_and_stores_nothing() {
    let oracle = Arc::new(Slow {
        demo: DemoOracle::new(Arc::new(DesignPriors::builtin())),
        delay: Duration::from_millis(300),
        started: AtomicUsize::new(0),
        finished: AtomicUsize::new(0),
    });
    let state = state(oracle.clone());
    let app = router(state.clone());

    let request = post_json("/api/generate", json!({"prompt": "Create a todo app"}));
    let outcome = tokio::time::timeout(Duration::from_millis(100), app.oneshot(request)).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(oracle.started.load(Ordering::SeqCst) > 0);
    assert_eq!(oracle.finished.load(Ordering::SeqCst), 0);
    assert!(state.store.read().is_empty());
}
