//! Ingest command implementation.
//!
//! Transcribes call recordings, tags them against the vocabulary, and
//! writes one JSON file per call into the archive directory. The
//! date-bearing recording file name is kept as the JSON stem so the loader
//! can recover the call date.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::{Result, RingeError};
use crate::llm::create_generator;
use crate::tagger::LlmTagger;
use crate::transcription::{Transcriber, WhisperTranscriber};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "aac"];

/// Run the ingest command.
pub async fn run_ingest(path: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e);
    }

    let files = collect_audio_files(Path::new(path))?;
    if files.is_empty() {
        return Err(RingeError::InvalidInput(format!(
            "No audio files found at {}",
            path
        )));
    }

    let archive_dir = settings.json_dir();
    std::fs::create_dir_all(&archive_dir)?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let generator = create_generator(&settings)?;
    let transcriber = WhisperTranscriber::with_config(
        &settings.transcription.model,
        settings.transcription.language.as_deref(),
    );
    let tagger = LlmTagger::new(generator, prompts, settings.tags.vocabulary.clone());

    Output::info(&format!(
        "Ingesting {} recording(s) into {}",
        files.len(),
        archive_dir.display()
    ));
    let pb = Output::progress_bar(files.len() as u64, "transcribing");

    let results: Vec<Result<()>> = stream::iter(files.iter())
        .map(|file| {
            let transcriber = &transcriber;
            let tagger = &tagger;
            let archive_dir = &archive_dir;
            let pb = &pb;
            async move {
                let result = ingest_one(file, transcriber, tagger, archive_dir).await;
                pb.inc(1);
                result
            }
        })
        .buffer_unordered(settings.transcription.max_concurrent.max(1))
        .collect()
        .await;
    pb.finish_and_clear();

    let failed = results.iter().filter(|r| r.is_err()).count();
    let succeeded = results.len() - failed;

    Output::success(&format!("Ingested {} call(s)", succeeded));
    if failed > 0 {
        Output::warning(&format!("{} recording(s) failed; see the log", failed));
    }

    Ok(())
}

/// Transcribe, tag, and store one recording.
async fn ingest_one(
    audio_path: &Path,
    transcriber: &WhisperTranscriber,
    tagger: &LlmTagger,
    archive_dir: &Path,
) -> Result<()> {
    let transcript = transcriber.transcribe(audio_path).await.map_err(|e| {
        warn!("Transcription failed for {}: {}", audio_path.display(), e);
        e
    })?;

    // A tagging failure downgrades to an untagged call rather than losing
    // the transcript.
    let tags = match tagger.assign_tags(&transcript.text).await {
        Ok(tags) => tags,
        Err(e) => {
            warn!("Tagging failed for {}: {}", audio_path.display(), e);
            Vec::new()
        }
    };

    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("call");
    let out_path = archive_dir.join(format!("{}.json", stem));

    let json = serde_json::json!({
        "text": transcript.text,
        "language": transcript.language,
        "duration_seconds": transcript.duration_seconds,
        "tags": {"fixed_tags": tags},
    });
    std::fs::write(&out_path, serde_json::to_string_pretty(&json)?)?;

    info!("Stored {}", out_path.display());
    Ok(())
}

/// Collect recordings from a file or directory, sorted by name.
fn collect_audio_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(RingeError::DataNotFound(path.display().to_string()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_audio_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_2024-01-06.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("a_2024-01-05.WAV"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = collect_audio_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a_2024-01-05.WAV"));
    }

    #[test]
    fn test_collect_missing_path() {
        assert!(collect_audio_files(Path::new("/no/such/audio")).is_err());
    }
}
