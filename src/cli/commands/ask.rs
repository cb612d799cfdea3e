//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::CallAnalytics;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(query: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Some(model) = model {
        settings.llm.model = model;
    }

    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = CallAnalytics::new(settings)?;

    let spinner = Output::spinner("Analyzing the call archive...");
    match orchestrator.process_query(query).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            Output::header("Details");
            Output::kv("Period", &response.raw_results.summary_stats.date_range);
            Output::kv(
                "Calls analyzed",
                &response.total_calls_analyzed.to_string(),
            );
            Output::kv("Tags", &response.analysis_plan.target_tags.join(", "));
            Output::kv("Model", &response.model_used);
            Output::kv(
                "Processing time",
                &format!("{:.1}s", response.processing_time),
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to process query: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
