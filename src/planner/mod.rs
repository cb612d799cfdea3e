//! LLM-backed query planning.
//!
//! The planner turns a natural-language analytics query into an
//! `AnalysisPlan`: it prompts the configured LLM for a JSON plan, validates
//! whatever comes back, and on any failure falls back to a keyword-sniffed
//! default so the pipeline always has a usable plan.

use crate::config::{Prompts, TagSettings};
use crate::error::{Result, RingeError};
use crate::llm::{GenerateOptions, TextGenerator};
use crate::plan::{
    normalize, parse_time_period, AnalysisPlan, Grouping, MetricKind, PlanContext, RawPlan,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Turns user queries into validated analysis plans.
pub struct QueryPlanner {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    vocabulary: Vec<String>,
    fallback_tag: String,
    default_window_days: u32,
}

impl QueryPlanner {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Prompts,
        tags: &TagSettings,
        default_window_days: u32,
    ) -> Self {
        Self {
            generator,
            prompts,
            vocabulary: tags.vocabulary.clone(),
            fallback_tag: tags.fallback_tag.clone(),
            default_window_days,
        }
    }

    /// Create an analysis plan for the query.
    ///
    /// Never fails: transport errors, timeouts, and malformed planner JSON
    /// all degrade to the heuristic default plan.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn create_plan(&self, query: &str) -> AnalysisPlan {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("vocabulary".to_string(), self.vocabulary.join(", "));
        vars.insert(
            "current_date".to_string(),
            Utc::now().format("%Y-%m-%d").to_string(),
        );

        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.planner.user, &vars);

        let options = GenerateOptions {
            temperature: 0.1,
            max_tokens: 500,
            json: true,
        };

        let raw = match self.generator.generate(&prompt, &options).await {
            Ok(response) => match Self::parse_raw_plan(&response) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Planner returned unusable JSON, using default plan: {}", e);
                    return self.fallback_plan(query);
                }
            },
            Err(e) => {
                warn!("Planner LLM call failed, using default plan: {}", e);
                return self.fallback_plan(query);
            }
        };

        let plan = normalize(raw, &self.context());
        info!(
            "Plan: period {}, tags [{}], metrics {:?}",
            plan.time_period.date_range(),
            plan.target_tags.join(", "),
            plan.metrics
        );
        plan
    }

    fn context(&self) -> PlanContext<'_> {
        PlanContext {
            vocabulary: &self.vocabulary,
            fallback_tag: &self.fallback_tag,
            default_window_days: self.default_window_days,
            now: Utc::now(),
        }
    }

    /// Parse the planner response into a raw plan.
    ///
    /// Models often wrap the JSON in prose or a markdown fence; extract
    /// the outermost brace-delimited object before deserializing.
    fn parse_raw_plan(response: &str) -> Result<RawPlan> {
        let json_start = response.find('{');
        let json_end = response.rfind('}');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        serde_json::from_str(json_str).map_err(|e| {
            // Char-based truncation: the response is usually Cyrillic and
            // byte slicing would panic mid-character.
            let preview: String = response.chars().take(500).collect();
            RingeError::Planning(format!(
                "Failed to parse planner response: {}. Response was: {}",
                e, preview
            ))
        })
    }

    /// Heuristic default plan: sniff vocabulary tags from the query text,
    /// default window, count + trends by month.
    fn fallback_plan(&self, query: &str) -> AnalysisPlan {
        let target_tags = self.sniff_tags(query);
        debug!("Default plan tags: [{}]", target_tags.join(", "));

        AnalysisPlan {
            time_period: parse_time_period(None, &self.context()),
            target_tags,
            metrics: vec![MetricKind::CountByTag, MetricKind::TagTrends],
            grouping: Grouping::Month,
            comparison_tags: Vec::new(),
        }
    }

    /// Match vocabulary tags against the query by their component words.
    ///
    /// A tag is a candidate when one of its underscore-separated words and
    /// one of the query's words contain each other (so "качеств" in the
    /// query still hits "низкое_качество_стирки_или_чистки").
    fn sniff_tags(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        let query_words: Vec<&str> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 4)
            .collect();

        let mut tags: Vec<String> = Vec::new();
        for tag in &self.vocabulary {
            let hit = tag
                .to_lowercase()
                .split('_')
                .filter(|w| w.chars().count() >= 4)
                .any(|tag_word| {
                    query_words
                        .iter()
                        .any(|qw| qw.contains(tag_word) || tag_word.contains(qw))
                });

            if hit && !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        if tags.is_empty() {
            tags.push(self.fallback_tag.clone());
        }
        tags
    }
}
