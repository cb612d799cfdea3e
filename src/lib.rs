//! Ringe - Call Analytics
//!
//! A local-first CLI for analyzing a phone-call archive in natural
//! language.
//!
//! The name "Ringe" comes from the Norwegian word for "to call."
//!
//! # Overview
//!
//! Ringe allows you to:
//! - Transcribe call recordings and tag them against a fixed vocabulary
//! - Keep the archive as plain per-call JSON files (or one CSV)
//! - Ask analytics questions in natural language and get answers with the
//!   underlying numbers
//! - Serve the same pipeline over HTTP for other systems
//!
//! # Architecture
//!
//! Every query runs through a plan → execute → explain loop:
//!
//! - `calls` - call records, loaders, and the cached repository
//! - `index` - in-memory SQLite mirror for tag/date lookups
//! - `plan` - analysis plans and their validation
//! - `planner` - LLM query planning with a heuristic fallback
//! - `metrics` - metric execution over the call collection
//! - `answer` - LLM answer generation with a deterministic fallback
//! - `llm` - text-generation backends (OpenAI, Ollama)
//! - `transcription` / `tagger` - the ingest path
//! - `orchestrator` - pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use ringe::config::Settings;
//! use ringe::orchestrator::CallAnalytics;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let analytics = CallAnalytics::new(settings)?;
//!
//!     let response = analytics
//!         .process_query("сколько жалоб на качество за последний месяц?")
//!         .await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod calls;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod metrics;
pub mod openai;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod tagger;
pub mod tags;
pub mod transcription;

pub use error::{Result, RingeError};
