//! Uniform call contract for the external text-generation service.
//!
//! Backends implement [`Oracle`] and only move text. [`OracleClient`] is the
//! single chokepoint the pipeline talks to: it caps concurrent calls, applies
//! a per-call timeout and turns the raw text into JSON.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::events::Stage;
use crate::seed::Seed;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("empty response from oracle")]
    Empty,
    #[error("invalid JSON response: {reason} (content: {preview})")]
    MalformedJson { reason: String, preview: String },
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle limiter closed")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    /// Which stage is asking; backends may use it for logging only.
    pub stage: Stage,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub seed: Seed,
    pub json_mode: bool,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the raw completion text.
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;
}

pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    limiter: Semaphore,
    timeout: Duration,
}

impl OracleClient {
    pub fn new(oracle: Arc<dyn Oracle>, max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            oracle,
            limiter: Semaphore::new(max_concurrency.max(1)),
            timeout,
        }
    }

    pub async fn invoke(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let _permit = self.limiter.acquire().await.map_err(|_| OracleError::Unavailable)?;
        debug!(stage = %request.stage, seed = %request.seed, temperature = request.temperature, "oracle call");
        let raw = tokio::time::timeout(self.timeout, self.oracle.complete(request))
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))??;
        if request.json_mode {
            parse_json_payload(&raw)
        } else if raw.trim().is_empty() {
            Err(OracleError::Empty)
        } else {
            Ok(Value::String(raw))
        }
    }
}

/// Removes at most one pair of markdown fences (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_json_payload(raw: &str) -> Result<Value, OracleError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(OracleError::Empty);
    }
    serde_json::from_str(body).map_err(|e| OracleError::MalformedJson {
        reason: e.to_string(),
        preview: preview(body, 200),
    })
}

/// First `max` characters of `text`, marked when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...[{} chars]", &text[..cut], text.chars().count()),
        None => text.to_string(),
    }
}
