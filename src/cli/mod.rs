//! CLI module for Ringe.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Ringe - Call Analytics
///
/// A local-first CLI for phone-call analytics: transcribe recordings, tag
/// them against a fixed vocabulary, and query the archive in natural
/// language. The name "Ringe" comes from the Norwegian word for "to call."
#[derive(Parser, Debug)]
#[command(name = "ringe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Ringe: write the default config and create data directories
    Init,

    /// Ask one analytics question about the call archive
    Ask {
        /// The question, e.g. "сколько жалоб на качество за последний месяц?"
        query: String,

        /// LLM model override for planning and answering
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive analytics session
    Chat,

    /// Show statistics over the loaded call data
    Stats,

    /// Transcribe and tag call recordings into the call archive
    Ingest {
        /// Audio file or directory of audio files
        path: String,
    },

    /// Export the call archive to a single CSV file
    Export {
        /// Output file (calls.csv if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "llm.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
