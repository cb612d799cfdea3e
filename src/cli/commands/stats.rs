//! Stats command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::CallAnalytics;
use anyhow::Result;

/// Run the stats command.
pub fn run_stats(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Export, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = CallAnalytics::new(settings)?;
    let info = orchestrator.system_info()?;

    Output::header("Call Archive");
    Output::kv("Total calls", &info.total_calls.to_string());
    Output::kv("Unique tags", &info.unique_tags_count.to_string());
    if let Some(range) = &info.date_range {
        Output::kv("Date range", &format!("{} - {}", range.start, range.end));
    }
    Output::kv(
        "Average text length",
        &format!("{} chars", info.average_text_length),
    );
    Output::kv("Model", &info.model);
    Output::kv("Source", &info.data_source);

    if !info.top_tags.is_empty() {
        Output::header("Top Tags");
        for (i, (tag, count)) in info.top_tags.iter().enumerate() {
            Output::ranked_item(i + 1, &format!("{}: {}", tag, count));
        }
    }

    Ok(())
}
