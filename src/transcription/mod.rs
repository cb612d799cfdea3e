//! Audio transcription boundary.
//!
//! Transcription is an external collaborator: the pipeline only needs
//! "text + metadata from an audio file". One implementation backed by the
//! OpenAI audio API ships with the crate.

mod whisper;

pub use whisper::{is_api_key_configured, WhisperTranscriber};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Transcription output for one call recording.
#[derive(Debug, Clone)]
pub struct CallTranscript {
    /// The transcribed text.
    pub text: String,
    /// Detected or hinted language, when the backend reports one.
    pub language: Option<String>,
    /// Audio duration in seconds.
    pub duration_seconds: f64,
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a single audio file.
    async fn transcribe(&self, audio_path: &Path) -> Result<CallTranscript>;
}
