use async_trait::async_trait;
use reqwest::Client;
use serde::{de::IgnoredAny, Deserialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::oracle::{preview, Oracle, OracleError, OracleRequest};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// `Oracle` backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiOracle {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, self.api_key)
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = self.endpoint();
        info!("🔗 {} stage request to: {}", request.stage, url.replace(&self.api_key, "***"));

        let response = self
            .client
            .post(&url)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            error!("❌ Gemini API error response: {}", preview(&response_text, 500));
            return Err(OracleError::Status { status: status.as_u16(), body: response_text });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            OracleError::MalformedJson { reason: e.to_string(), preview: preview(&response_text, 200) }
        })?;
        let text = first_text(&parsed).ok_or(OracleError::Empty)?;
        info!("✅ {} stage answered with {} chars", request.stage, text.len());
        Ok(text)
    }
}

fn request_body(request: &OracleRequest) -> Value {
    let mut generation_config = json!({
        "temperature": request.temperature,
        "seed": request.seed.value(),
        "candidateCount": 1
    });
    if request.json_mode {
        generation_config["responseMimeType"] = json!("application/json");
    }
    json!({
        "systemInstruction": {"parts": [{"text": request.system}]},
        "contents": [{
            "role": "user",
            "parts": [{"text": request.user}]
        }],
        "generationConfig": generation_config
    })
}

/// Text parts of the first candidate, joined.
fn first_text(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::Other(_) => None,
        })
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(IgnoredAny),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Stage;
    use crate::seed::Seed;
    use pretty_assertions::assert_eq;

    #[test]
    fn body_carries_seed_temperature_and_json_mode() {
        let request = OracleRequest {
            stage: Stage::Theme,
            system: "be a designer".into(),
            user: "theme it".into(),
            temperature: 0.35,
            seed: Seed::new(42),
            json_mode: true,
        };
        let body = request_body(&request);
        assert_eq!(body["generationConfig"]["seed"], 42);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be a designer");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "theme it");

        let plain = request_body(&OracleRequest { json_mode: false, ..request });
        assert!(plain["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"inlineData": {}}, {"text": " 1}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(first_text(&resp).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn no_candidates_means_no_text() {
        let resp: GeminiResponse = serde_json::from_value(json!({"promptFeedback": {}})).unwrap();
        assert_eq!(first_text(&resp), None);
    }

    #[test]
    fn endpoint_uses_model_and_trims_base() {
        let oracle = GeminiOracle::new("k".into(), "http://localhost:9/v1beta/".into(), "m".into());
        assert_eq!(oracle.endpoint(), "http://localhost:9/v1beta/models/m:generateContent?key=k");
    }
}
