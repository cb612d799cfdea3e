//! LLM tag assignment from the fixed vocabulary.
//!
//! During ingest, each transcript is labeled with zero or more vocabulary
//! tags. The LLM proposes tags; everything it returns is resolved through
//! the canonical matcher and anything outside the vocabulary is dropped.

use crate::config::Prompts;
use crate::error::{Result, RingeError};
use crate::llm::{GenerateOptions, TextGenerator};
use crate::tags::match_tag;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Assigns vocabulary tags to call transcripts.
pub struct LlmTagger {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    vocabulary: Vec<String>,
}

impl LlmTagger {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Prompts,
        vocabulary: Vec<String>,
    ) -> Self {
        Self {
            generator,
            prompts,
            vocabulary,
        }
    }

    /// Tag one transcript. An empty tag list is a legal outcome; only
    /// transport/parse failures surface as errors.
    #[instrument(skip(self, transcript))]
    pub async fn assign_tags(&self, transcript: &str) -> Result<Vec<String>> {
        let mut vars = HashMap::new();
        vars.insert("vocabulary".to_string(), self.vocabulary.join(", "));
        vars.insert("transcript".to_string(), transcript.to_string());

        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.tagging.user, &vars);

        let options = GenerateOptions {
            temperature: 0.1,
            max_tokens: 200,
            json: false,
        };

        let response = self.generator.generate(&prompt, &options).await?;
        let candidates = Self::parse_tag_array(&response)?;

        let mut tags = Vec::new();
        for candidate in &candidates {
            match match_tag(candidate, &self.vocabulary) {
                Some(canonical) => {
                    if !tags.contains(&canonical.to_string()) {
                        tags.push(canonical.to_string());
                    }
                }
                None => warn!("Tagger proposed unknown tag {:?}, dropping", candidate),
            }
        }

        debug!("Assigned {} tags", tags.len());
        Ok(tags)
    }

    /// Extract the bracket-delimited JSON array from a possibly chatty
    /// response.
    fn parse_tag_array(response: &str) -> Result<Vec<String>> {
        let json_start = response.find('[');
        let json_end = response.rfind(']');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        serde_json::from_str(json_str).map_err(|e| {
            // Char-based truncation: the response is usually Cyrillic and
            // byte slicing would panic mid-character.
            let preview: String = response.chars().take(500).collect();
            RingeError::Tagging(format!(
                "Failed to parse tagger response: {}. Response was: {}",
                e, preview
            ))
        })
    }
}
