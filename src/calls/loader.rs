//! Loaders for the two call-data layouts: a directory of per-call JSON
//! files, or a single CSV export.
//!
//! Individual malformed files and rows are skipped with a warning; a load
//! only fails when the backing directory or file is missing entirely.

use super::{extract_date_from_filename, CallRecord};
use crate::error::{Result, RingeError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load all `*.json` call files from a directory, sorted by file name.
pub fn load_json_dir(dir: &Path) -> Result<Vec<CallRecord>> {
    if !dir.is_dir() {
        return Err(RingeError::DataNotFound(dir.display().to_string()));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in &paths {
        let data = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&data) {
            Ok(v) => v,
            Err(e) => {
                warn!("Skipping malformed JSON {}: {}", path.display(), e);
                continue;
            }
        };

        records.push(record_from_json(records.len(), path, &value));
    }

    info!("Loaded {} calls from {}", records.len(), dir.display());
    Ok(records)
}

/// Build a record from one per-call JSON document.
///
/// Text comes from `text` or `transcription.text`; tags from
/// `tags.fixed_tags` or a bare `tags` array; the date from the file name.
fn record_from_json(index: usize, path: &Path, value: &serde_json::Value) -> CallRecord {
    let full_text = value["text"]
        .as_str()
        .or_else(|| value["transcription"]["text"].as_str())
        .unwrap_or_default()
        .to_string();

    let tags = value["tags"]["fixed_tags"]
        .as_array()
        .or_else(|| value["tags"].as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let summary = value["reason"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    CallRecord::new(
        format!("call_{}", index),
        extract_date_from_filename(path),
        full_text,
        summary,
        tags,
        path.display().to_string(),
    )
}

/// One row of the CSV export; every column is optional so partial exports
/// still load.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Load calls from a single CSV file with `date,text,tags,summary` columns.
pub fn load_csv_file(path: &Path) -> Result<Vec<CallRecord>> {
    if !path.is_file() {
        return Err(RingeError::DataNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed CSV row {}: {}", line + 2, e);
                continue;
            }
        };

        let call_date = row
            .date
            .as_deref()
            .and_then(parse_csv_date)
            .unwrap_or_else(Utc::now);

        records.push(CallRecord::new(
            format!("call_{}", records.len()),
            call_date,
            row.text.unwrap_or_default(),
            row.summary.filter(|s| !s.is_empty()),
            parse_tag_list(row.tags.as_deref().unwrap_or_default()),
            format!("{}:{}", path.display(), line + 2),
        ));
    }

    info!("Loaded {} calls from {}", records.len(), path.display());
    Ok(records)
}

/// Parse a CSV date cell: `YYYY-MM-DD HH:MM:SS`, bare `YYYY-MM-DD`, or
/// RFC 3339.
fn parse_csv_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    debug!("Unparseable CSV date: {:?}", raw);
    None
}

/// Parse a stored tag list back into a sequence.
///
/// Accepts a JSON array (`["a", "b"]`) or the Python-style printed list
/// the original export wrote (`['a', 'b']`).
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "[]" {
        return Vec::new();
    }

    if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
        return tags;
    }

    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|t| t.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
