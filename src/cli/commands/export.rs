//! Export command implementation.
//!
//! Flattens the call archive into a single CSV with
//! `date,text,tags,summary,source_file` columns; tags are stored as a JSON
//! array string the CSV loader can parse back.

use crate::calls::CallStore;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the export command.
pub fn run_export(output: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Export, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = CallStore::new(settings.call_source());
    let calls = store.load_all()?;

    if calls.is_empty() {
        Output::warning("No calls to export.");
        return Ok(());
    }

    let output = output.unwrap_or_else(|| "calls.csv".to_string());
    let mut writer = csv::Writer::from_path(&output)?;

    writer.write_record(["date", "text", "tags", "summary", "source_file"])?;
    for call in calls.iter() {
        writer.write_record([
            call.call_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            call.full_text.clone(),
            serde_json::to_string(&call.tags)?,
            call.summary.clone().unwrap_or_default(),
            call.source_file.clone(),
        ])?;
    }
    writer.flush()?;

    Output::success(&format!("Exported {} calls to {}", calls.len(), output));
    Ok(())
}
