//! Pipeline orchestrator for Ringe.
//!
//! Owns the call store and the LLM-backed stages, and coordinates one
//! query through plan → execute → answer. A failed query never corrupts
//! the cached collection; only a missing data source is terminal.

use crate::answer::AnswerEngine;
use crate::calls::CallStore;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{create_generator, TextGenerator};
use crate::metrics::{execute_plan, ResultBundle};
use crate::plan::AnalysisPlan;
use crate::planner::QueryPlanner;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// The main orchestrator for the Ringe pipeline.
pub struct CallAnalytics {
    settings: Settings,
    store: Arc<CallStore>,
    generator: Arc<dyn TextGenerator>,
    planner: QueryPlanner,
    answer_engine: AnswerEngine,
}

impl CallAnalytics {
    /// Create an orchestrator from configuration.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let generator = create_generator(&settings)?;
        let store = Arc::new(CallStore::new(settings.call_source()));

        Ok(Self::assemble(settings, prompts, generator, store))
    }

    /// Create an orchestrator with custom components (tests, embedding in
    /// another binary).
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        generator: Arc<dyn TextGenerator>,
        store: Arc<CallStore>,
    ) -> Self {
        Self::assemble(settings, prompts, generator, store)
    }

    fn assemble(
        settings: Settings,
        prompts: Prompts,
        generator: Arc<dyn TextGenerator>,
        store: Arc<CallStore>,
    ) -> Self {
        let planner = QueryPlanner::new(
            generator.clone(),
            prompts.clone(),
            &settings.tags,
            settings.analysis.default_window_days,
        );
        let answer_engine = AnswerEngine::new(generator.clone(), prompts);

        Self {
            settings,
            store,
            generator,
            planner,
            answer_engine,
        }
    }

    /// The call store.
    pub fn store(&self) -> Arc<CallStore> {
        self.store.clone()
    }

    /// The settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process one analytics query through the full pipeline.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn process_query(&self, query: &str) -> Result<QueryResponse> {
        let started = Instant::now();

        let calls = self.store.load_all()?;
        info!("Analyzing query over {} calls", calls.len());

        let plan = self.planner.create_plan(query).await;
        let results = execute_plan(&plan, &calls, self.settings.analysis.top_n);
        let answer = self
            .answer_engine
            .generate_answer(query, &results, &plan)
            .await;

        let total_calls_analyzed = results.summary_stats.total_calls;

        Ok(QueryResponse {
            query: query.to_string(),
            analysis_plan: plan,
            raw_results: results,
            answer,
            total_calls_analyzed,
            processing_time: started.elapsed().as_secs_f64(),
            model_used: self.generator.model_name().to_string(),
        })
    }

    /// Summary statistics over the loaded data.
    pub fn system_info(&self) -> Result<SystemInfo> {
        let index = self.store.tag_index()?;

        let date_range = index.date_range()?.map(|(start, end)| DateRange {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        });

        Ok(SystemInfo {
            total_calls: index.call_count()?,
            unique_tags_count: index.unique_tag_count()?,
            date_range,
            average_text_length: index.average_text_length()?,
            top_tags: index.top_tags(self.settings.analysis.top_n)?,
            model: self.generator.model_name().to_string(),
            data_source: self.store.source().describe(),
        })
    }

    /// Re-read the call data, dropping the cache and the derived index.
    pub fn reload(&self) -> Result<usize> {
        self.store.reload()
    }
}

/// The response envelope returned for every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub analysis_plan: AnalysisPlan,
    pub raw_results: ResultBundle,
    pub answer: String,
    pub total_calls_analyzed: u64,
    /// Wall-clock pipeline time in seconds.
    pub processing_time: f64,
    pub model_used: String,
}

/// Data statistics for the stats command and the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub total_calls: usize,
    pub unique_tags_count: usize,
    pub date_range: Option<DateRange>,
    pub average_text_length: usize,
    pub top_tags: Vec<(String, usize)>,
    pub model: String,
    pub data_source: String,
}

/// Formatted first/last call dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallSource;
    use crate::error::RingeError;
    use crate::llm::GenerateOptions;
    use async_trait::async_trait;

    /// Stub backend: first call (planning) replays the plan response,
    /// later calls fail so the answer path exercises the fallback.
    struct PlanOnlyGenerator {
        plan_json: String,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for PlanOnlyGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
            let n = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                Ok(self.plan_json.clone())
            } else {
                Err(RingeError::Llm("analyzer offline".to_string()))
            }
        }

        fn model_name(&self) -> &str {
            "stub-model"
        }
    }

    fn write_call(dir: &std::path::Path, name: &str, tags: &[&str]) {
        let json = serde_json::json!({
            "text": "разговор с клиентом",
            "tags": {"fixed_tags": tags},
        });
        std::fs::write(dir.join(name), json.to_string()).unwrap();
    }

    fn orchestrator(dir: &std::path::Path, plan_json: &str) -> CallAnalytics {
        let settings = Settings::default();
        let store = Arc::new(CallStore::new(CallSource::JsonDir(dir.to_path_buf())));
        let generator = Arc::new(PlanOnlyGenerator {
            plan_json: plan_json.to_string(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        CallAnalytics::with_components(settings, Prompts::default(), generator, store)
    }

    #[tokio::test]
    async fn test_process_query_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_call(dir.path(), "2024-01-05.json", &["долго_нет_ответа_на_заявку"]);
        write_call(dir.path(), "2024-02-10.json", &["долго_нет_ответа_на_заявку"]);
        write_call(dir.path(), "2024-02-20.json", &["погашение_долга"]);

        let plan_json = r#"{
            "time_period": {"description": "первые два месяца", "start": "2024-01-01", "end": "2024-02-28"},
            "target_tags": ["долго_нет_ответа"],
            "metrics": ["count_by_tag", "tag_trends"],
            "grouping": "month"
        }"#;

        let orchestrator = orchestrator(dir.path(), plan_json);
        let response = orchestrator.process_query("динамика ответов на заявки").await.unwrap();

        assert_eq!(response.total_calls_analyzed, 3);
        assert_eq!(response.model_used, "stub-model");
        assert_eq!(
            response.analysis_plan.target_tags,
            vec!["долго_нет_ответа_на_заявку"]
        );

        let counts = response.raw_results.count_by_tag.as_ref().unwrap();
        assert_eq!(counts.get("долго_нет_ответа_на_заявку"), Some(&2));

        // The analyzer stub failed, so the answer is the deterministic
        // fallback and must still carry the numbers.
        assert!(response.answer.contains("долго_нет_ответа_на_заявку: 2"));

        // Round-trips as the JSON envelope.
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"analysis_plan\""));
        assert!(json.contains("\"raw_results\""));
    }

    #[tokio::test]
    async fn test_empty_store_yields_no_data_answer() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), "{}");

        let response = orchestrator.process_query("сколько звонков?").await.unwrap();
        assert!(response.raw_results.is_no_data());
        assert_eq!(response.total_calls_analyzed, 0);
        assert!(response.answer.contains("could not find enough call data"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_terminal() {
        let settings = Settings::default();
        let store = Arc::new(CallStore::new(CallSource::JsonDir(
            std::path::PathBuf::from("/no/such/dir"),
        )));
        let generator = Arc::new(PlanOnlyGenerator {
            plan_json: "{}".to_string(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let orchestrator =
            CallAnalytics::with_components(settings, Prompts::default(), generator, store);

        let err = orchestrator.process_query("что-нибудь").await.unwrap_err();
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[tokio::test]
    async fn test_system_info() {
        let dir = tempfile::tempdir().unwrap();
        write_call(dir.path(), "2024-01-05.json", &["погашение_долга"]);
        write_call(dir.path(), "2024-03-01.json", &["погашение_долга", "консультация_или_уточнение_деталей"]);

        let orchestrator = orchestrator(dir.path(), "{}");
        let info = orchestrator.system_info().unwrap();

        assert_eq!(info.total_calls, 2);
        assert_eq!(info.unique_tags_count, 2);
        let range = info.date_range.unwrap();
        assert_eq!(range.start, "2024-01-05");
        assert_eq!(range.end, "2024-03-01");
        assert_eq!(info.top_tags[0].0, "погашение_долга");
        assert_eq!(info.model, "stub-model");
    }
}
