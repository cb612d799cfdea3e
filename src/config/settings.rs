//! Configuration settings for Ringe.

use crate::calls::CallSource;
use crate::plan::DEFAULT_WINDOW_DAYS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub calls: CallsSettings,
    pub tags: TagSettings,
    pub llm: LlmSettings,
    pub analysis: AnalysisSettings,
    pub transcription: TranscriptionSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.ringe".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Where call data is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallsSettings {
    /// Source kind: "json" (directory of per-call files) or "csv".
    pub source: String,
    /// Directory of per-call JSON files.
    pub json_dir: String,
    /// Single CSV export (for the csv source).
    pub csv_path: String,
}

impl Default for CallsSettings {
    fn default() -> Self {
        Self {
            source: "json".to_string(),
            json_dir: "~/.ringe/calls".to_string(),
            csv_path: "~/.ringe/calls.csv".to_string(),
        }
    }
}

/// The fixed tag vocabulary. The engine never invents tags; this list is
/// configuration, not inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSettings {
    /// Canonical tag strings.
    pub vocabulary: Vec<String>,
    /// Substituted when a plan validates to zero tags.
    pub fallback_tag: String,
}

impl Default for TagSettings {
    fn default() -> Self {
        let vocabulary: Vec<String> = [
            "низкое_качество_стирки_или_чистки",
            "не_заменили_ковры_вовремя",
            "клиент_хочет_добавить_ковры",
            "клиент_хочет_меньше_ковров",
            "погашение_долга",
            "расторжение_договора",
            "возобновление_услуг",
            "долго_нет_ответа_на_заявку",
            "лишняя_доставка",
            "доставили_не_те_ковры",
            "не_выставлен_вовремя_счет",
            "неверная_сумма_в_счете",
            "ковер_забрали_без_причины",
            "забрали_не_тот_ковер",
            "менеджер_нагрубил_клиенту",
            "неоправданно_высокие_цены",
            "неоправданный_рост_цен",
            "новый_клиент_заключение_договора",
            "консультация_или_уточнение_деталей",
            "поменять_спецификации",
            "менеджер_обещал_но_не_связался_с_клиентом",
            "клиент_уходит_к_конкурентам",
            "приостановить_услуги",
            "ошибка_в_документах",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        Self {
            fallback_tag: vocabulary[0].clone(),
            vocabulary,
        }
    }
}

/// LLM backend selector.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions (remote).
    #[default]
    OpenAI,
    /// Ollama HTTP API: local by default, a named remote node when
    /// `endpoint` is set.
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// LLM backend settings, shared by the planner and the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend provider (openai, ollama).
    pub provider: LlmProvider,
    /// Model name for planning and answering.
    pub model: String,
    /// Ollama endpoint override; None means the local default.
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            timeout_seconds: 120,
        }
    }
}

/// Metric execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Trailing window, in days, for queries with no usable period.
    pub default_window_days: u32,
    /// List length for the top-tags metric.
    pub top_n: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_window_days: DEFAULT_WINDOW_DAYS,
            top_n: 5,
        }
    }
}

/// Audio transcription settings (ingest only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Language hint passed to the transcription API.
    pub language: Option<String>,
    /// Maximum concurrent transcriptions during ingest.
    pub max_concurrent: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: Some("ru".to_string()),
            max_concurrent: 2,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RingeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ringe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory where saved query results land.
    pub fn saved_results_dir(&self) -> PathBuf {
        self.data_dir().join("saved_results")
    }

    /// Get the expanded call JSON directory path.
    pub fn json_dir(&self) -> PathBuf {
        Self::expand_path(&self.calls.json_dir)
    }

    /// Resolve the configured call source.
    pub fn call_source(&self) -> CallSource {
        match self.calls.source.as_str() {
            "csv" => CallSource::CsvFile(Self::expand_path(&self.calls.csv_path)),
            _ => CallSource::JsonDir(self.json_dir()),
        }
    }
}
