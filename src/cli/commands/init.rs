//! Init command implementation.

use crate::cli::Output;
use crate::config::{LlmProvider, Settings};
use crate::transcription::is_api_key_configured;
use anyhow::Result;

/// Run the init command: write the default config and create the data
/// directories.
pub fn run_init(settings: &Settings) -> Result<()> {
    Output::header("Ringe Init");

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config already exists at {}", config_path.display()));
    } else {
        settings.save()?;
        Output::success(&format!("Wrote default config to {}", config_path.display()));
    }

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.json_dir())?;
    Output::success(&format!(
        "Call archive directory: {}",
        settings.json_dir().display()
    ));

    Output::kv("LLM backend", &settings.llm.provider.to_string());
    Output::kv("Model", &settings.llm.model);
    Output::kv("Vocabulary size", &settings.tags.vocabulary.len().to_string());

    if settings.llm.provider == LlmProvider::OpenAI && !is_api_key_configured() {
        Output::warning("OPENAI_API_KEY is not set; ask/chat/ingest will fail until it is.");
    }

    Output::info("Drop call JSON files into the archive directory, or run 'ringe ingest'.");
    Ok(())
}
