//! Pre-flight checks before expensive operations.
//!
//! Validates that the call data and required credentials are in place
//! before starting operations that would otherwise fail midway.

use crate::calls::CallSource;
use crate::config::{LlmProvider, Settings};
use crate::error::{Result, RingeError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ask/chat/serve: call data plus the configured LLM backend.
    Query,
    /// Ingest: transcription always goes through the OpenAI audio API.
    Ingest,
    /// Export: call data only.
    Export,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Query => {
            check_call_data(settings)?;
            if settings.llm.provider == LlmProvider::OpenAI {
                check_api_key()?;
            }
        }
        Operation::Ingest => {
            check_api_key()?;
        }
        Operation::Export => {
            check_call_data(settings)?;
        }
    }
    Ok(())
}

/// Check that the configured call source exists on disk.
fn check_call_data(settings: &Settings) -> Result<()> {
    match settings.call_source() {
        CallSource::JsonDir(dir) if !dir.is_dir() => {
            Err(RingeError::DataNotFound(dir.display().to_string()))
        }
        CallSource::CsvFile(path) if !path.is_file() => {
            Err(RingeError::DataNotFound(path.display().to_string()))
        }
        _ => Ok(()),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(RingeError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(RingeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_call_dir_names_expected_path() {
        let mut settings = Settings::default();
        settings.calls.json_dir = "/no/such/calls".to_string();
        settings.llm.provider = LlmProvider::Ollama;

        let err = check(Operation::Query, &settings).unwrap_err();
        assert!(err.to_string().contains("/no/such/calls"));
    }

    #[test]
    fn test_present_call_dir_passes_for_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.calls.json_dir = dir.path().display().to_string();
        settings.llm.provider = LlmProvider::Ollama;

        assert!(check(Operation::Query, &settings).is_ok());
    }
}
