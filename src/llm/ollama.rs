//! Ollama HTTP backend.
//!
//! Talks to the plain `/api/generate` endpoint: the local daemon by
//! default, or a named remote node when an endpoint override is
//! configured.

use super::{GenerateOptions, TextGenerator};
use crate::error::{Result, RingeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama-backed text generator.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: ModelOptions,
}

#[derive(Serialize)]
struct ModelOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a generator for the given model; `endpoint` of None means
    /// the local daemon.
    pub fn with_config(model: &str, endpoint: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RingeError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, endpoint = %self.endpoint))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: options.json.then_some("json"),
            options: ModelOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| RingeError::Llm(format!("Ollama request failed: {}", e)))?;

        let body: GenerateResponse = response.json().await?;

        if body.response.trim().is_empty() {
            return Err(RingeError::Llm("Empty response from Ollama".to_string()));
        }

        debug!("Generated {} characters", body.response.len());
        Ok(body.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
