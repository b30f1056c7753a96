//! Gemini API Client
//!
//! Generative calls back the [`Oracle`] transport; batch embedding calls back
//! the alternative embedding candidate selector.
//!
//! # API Reference
//! - `POST {endpoint}/models/{model}:generateContent`
//! - `POST {endpoint}/models/{model}:batchEmbedContents`
//! - Credential travels in the `x-goog-api-key` header

use super::{Oracle, OracleError};
use async_trait::async_trait;
use reqwest::Client;
use rollcall_common::config::OracleConfig;
use rollcall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini client
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    embedding_model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Create client from oracle configuration
    ///
    /// # Errors
    /// Returns `Error::Config` for a blank key or when the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, config: &OracleConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn embed_url(&self) -> String {
        format!("{}/models/{}:batchEmbedContents", self.endpoint, self.embedding_model)
    }

    fn generate_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    fn embed_request(&self, texts: &[String]) -> BatchEmbedRequest {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.embedding_model),
                    content: Content::user(text),
                })
                .collect(),
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<R, OracleError> {
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Network(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| OracleError::Parse(format!("Failed to parse Gemini response: {}", e)))
    }

    /// Embed texts in one batch call; one vector per input, in input order
    pub async fn batch_embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, OracleError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.embedding_model, count = texts.len(), "Requesting embeddings");

        let response: BatchEmbedResponse =
            self.post_json(&self.embed_url(), &self.embed_request(texts)).await?;

        if response.embeddings.len() != texts.len() {
            return Err(OracleError::Invalid(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, OracleError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Querying Gemini");

        let response: GenerateContentResponse = self
            .post_json(&self.generate_url(), &self.generate_request(prompt))
            .await?;

        extract_text(response)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> std::result::Result<String, OracleError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    #[serde(default)]
    values: Vec<f32>,
}
