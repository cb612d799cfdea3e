//! LLM backend abstraction.
//!
//! Both pipeline stages that talk to a model (planning, answering) go
//! through one capability trait; the backend is chosen from configuration
//! at construction time and call sites never branch on the concrete type.

mod ollama;
mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use crate::config::{LlmProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Per-request generation options.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for strict JSON output.
    pub json: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 800,
            json: false,
        }
    }
}

/// Trait for text-generating LLM backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;

    /// The model this backend generates with.
    fn model_name(&self) -> &str;
}

/// Build the configured generator.
///
/// OpenAI is the remote default; Ollama talks to the local daemon unless
/// `llm.endpoint` names a remote node.
pub fn create_generator(settings: &Settings) -> Result<Arc<dyn TextGenerator>> {
    let timeout = std::time::Duration::from_secs(settings.llm.timeout_seconds);

    let generator: Arc<dyn TextGenerator> = match settings.llm.provider {
        LlmProvider::OpenAI => Arc::new(OpenAiGenerator::with_config(&settings.llm.model, timeout)),
        LlmProvider::Ollama => Arc::new(OllamaGenerator::with_config(
            &settings.llm.model,
            settings.llm.endpoint.as_deref(),
            timeout,
        )?),
    };

    Ok(generator)
}
