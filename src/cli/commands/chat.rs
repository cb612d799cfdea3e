//! Interactive analytics session.
//!
//! A readline loop over the query pipeline with a small set of slash
//! commands and a bounded in-session history.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::{CallAnalytics, QueryResponse};
use chrono::{DateTime, Utc};
use console::style;
use std::io::{self, BufRead, Write};

const MAX_HISTORY: usize = 20;

/// One processed query in the session history.
struct HistoryEntry {
    query: String,
    timestamp: DateTime<Utc>,
    processing_time: f64,
    result: QueryResponse,
}

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e);
    }

    let orchestrator = CallAnalytics::new(settings.clone())?;

    println!("\n{}", style("Ringe Analytics").bold().cyan());
    println!(
        "{}\n",
        style("Ask questions about the call archive. Type /help for commands, /exit to quit.")
            .dim()
    );

    let mut history: Vec<HistoryEntry> = Vec::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" | "exit" | "quit" => {
                Output::info("Goodbye!");
                break;
            }
            "/help" | "/?" => {
                show_help();
                continue;
            }
            "/stats" => {
                show_stats(&orchestrator);
                continue;
            }
            "/history" => {
                show_history(&history);
                continue;
            }
            "/save" => {
                save_last_result(&settings, &history);
                continue;
            }
            "/reload" => {
                match orchestrator.reload() {
                    Ok(count) => Output::success(&format!("Reloaded {} calls", count)),
                    Err(e) => Output::error(&format!("Reload failed: {}", e)),
                }
                continue;
            }
            _ => {}
        }

        let spinner = Output::spinner("Analyzing...");
        match orchestrator.process_query(input).await {
            Ok(response) => {
                spinner.finish_and_clear();

                println!("\n{} {}\n", style("Ringe:").cyan().bold(), response.answer);
                println!(
                    "{}",
                    style(format!(
                        "({} calls, {:.1}s, /save to keep this result)",
                        response.total_calls_analyzed, response.processing_time
                    ))
                    .dim()
                );

                history.push(HistoryEntry {
                    query: input.to_string(),
                    timestamp: Utc::now(),
                    processing_time: response.processing_time,
                    result: response,
                });
                if history.len() > MAX_HISTORY {
                    let excess = history.len() - MAX_HISTORY;
                    history.drain(..excess);
                }
            }
            Err(e) => {
                spinner.finish_and_clear();
                // One bad query must not end the session.
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

fn show_help() {
    Output::header("Commands");
    Output::kv("/help", "this help");
    Output::kv("/stats", "statistics over the call data");
    Output::kv("/history", "queries from this session");
    Output::kv("/save", "save the last result as JSON");
    Output::kv("/reload", "re-read the call archive from disk");
    Output::kv("/exit", "quit");

    Output::header("Example queries");
    Output::list_item("Сколько жалоб на качество в этом месяце?");
    Output::list_item("Динамика жалоб на доставку за последние 3 месяца");
    Output::list_item("Сравни жалобы на качество и доставку");
    Output::list_item("Топ-5 проблем клиентов в ноябре");
}

fn show_stats(orchestrator: &CallAnalytics) {
    match orchestrator.system_info() {
        Ok(info) => {
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
        }
        Err(e) => Output::error(&format!("Failed to compute stats: {}", e)),
    }
}

fn show_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        Output::info("No queries yet in this session.");
        return;
    }

    Output::header("Session History");
    for (i, entry) in history.iter().rev().take(10).enumerate() {
        let mut preview = entry.query.clone();
        if preview.chars().count() > 50 {
            preview = preview.chars().take(47).collect::<String>() + "...";
        }
        Output::ranked_item(
            i + 1,
            &format!(
                "[{}] {} ({:.1}s)",
                entry.timestamp.format("%H:%M"),
                preview,
                entry.processing_time
            ),
        );
    }
}

fn save_last_result(settings: &Settings, history: &[HistoryEntry]) {
    let Some(entry) = history.last() else {
        Output::warning("Nothing to save yet.");
        return;
    };

    let dir = settings.saved_results_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        Output::error(&format!("Failed to create {}: {}", dir.display(), e));
        return;
    }

    let filename = format!("result_{}.json", entry.timestamp.format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);

    match serde_json::to_string_pretty(&entry.result) {
        Ok(json) => match std::fs::write(&path, json) {
            Ok(()) => Output::success(&format!("Saved to {}", path.display())),
            Err(e) => Output::error(&format!("Failed to write {}: {}", path.display(), e)),
        },
        Err(e) => Output::error(&format!("Failed to serialize result: {}", e)),
    }
}
