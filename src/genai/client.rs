use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

pub const MISSING_KEY_MESSAGE: &str = "API Key not configured. AI features are unavailable.";

/// Source of generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(&self, prompt: &str, system_instruction: &str, temperature: f32) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
  contents: Vec<Content<'a>>,
  system_instruction: Content<'a>,
  generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
  parts: Vec<PartIn<'a>>,
}

#[derive(Serialize)]
struct PartIn<'a> {
  text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
  temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<PartOut>,
}

#[derive(Deserialize)]
struct PartOut {
  #[serde(default)]
  text: String,
}

impl GenerateResponse {
  fn text(self) -> String {
    self
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .map(|c| c.parts.into_iter().map(|p| p.text).collect())
      .unwrap_or_default()
  }
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
  http: ClientWithMiddleware,
  endpoint: Url,
  api_key: Option<String>,
}

impl GeminiClient {
  pub fn new(
    http: ClientWithMiddleware,
    base_url: &str,
    model: &str,
    api_key: Option<String>,
  ) -> Result<Self> {
    let endpoint = Url::parse(base_url)
      .and_then(|base| base.join(&format!("v1beta/models/{}:generateContent", model)))
      .map_err(|e| Error::Config(format!("Invalid generative base_url '{}': {}", base_url, e)))?;

    Ok(Self {
      http,
      endpoint,
      api_key,
    })
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  async fn generate(&self, prompt: &str, system_instruction: &str, temperature: f32) -> Result<String> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or_else(|| Error::Provider(MISSING_KEY_MESSAGE.to_string()))?;

    let body = GenerateRequest {
      contents: vec![Content {
        parts: vec![PartIn { text: prompt }],
      }],
      system_instruction: Content {
        parts: vec![PartIn {
          text: system_instruction,
        }],
      },
      generation_config: GenerationConfig { temperature },
    };

    debug!(endpoint = %self.endpoint, "generateContent");
    let response = self
      .http
      .post(self.endpoint.clone())
      .header("x-goog-api-key", api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| Error::Provider(format!("Generative request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      return Err(Error::Provider(format!(
        "Generative request failed with status: {}",
        status.as_u16()
      )));
    }

    let parsed: GenerateResponse = response
      .json()
      .await
      .map_err(|e| Error::Provider(format!("Unexpected generative response: {}", e)))?;
    Ok(parsed.text())
  }
}
