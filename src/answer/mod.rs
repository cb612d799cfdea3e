//! Answer assembly.
//!
//! The primary path hands (query, plan, results) to the LLM for prose. If
//! that call fails for any reason, a deterministic template takes over and
//! still reports the actual numbers; the fallback is an answer, not an
//! error message.

use crate::config::Prompts;
use crate::llm::{GenerateOptions, TextGenerator};
use crate::metrics::ResultBundle;
use crate::plan::AnalysisPlan;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Produces the final prose answer for a query.
pub struct AnswerEngine {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
}

impl AnswerEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts) -> Self {
        Self { generator, prompts }
    }

    /// Generate the answer. Never fails: LLM errors and empty responses
    /// degrade to the deterministic template.
    #[instrument(skip(self, results, plan), fields(query = %query))]
    pub async fn generate_answer(
        &self,
        query: &str,
        results: &ResultBundle,
        plan: &AnalysisPlan,
    ) -> String {
        let prompt = match self.build_prompt(query, results, plan) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to build analyzer prompt, using fallback: {}", e);
                return fallback_answer(results, plan);
            }
        };

        let options = GenerateOptions {
            temperature: 0.3,
            max_tokens: 800,
            json: false,
        };

        match self.generator.generate(&prompt, &options).await {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
            Ok(_) => {
                warn!("Analyzer returned an empty answer, using fallback");
                fallback_answer(results, plan)
            }
            Err(e) => {
                warn!("Analyzer LLM call failed, using fallback: {}", e);
                fallback_answer(results, plan)
            }
        }
    }

    fn build_prompt(
        &self,
        query: &str,
        results: &ResultBundle,
        plan: &AnalysisPlan,
    ) -> crate::error::Result<String> {
        let metrics: Vec<&str> = plan.metrics.iter().map(|m| m.as_str()).collect();

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("period".to_string(), plan.time_period.description.clone());
        vars.insert("tags".to_string(), plan.target_tags.join(", "));
        vars.insert("metrics".to_string(), metrics.join(", "));
        vars.insert(
            "results".to_string(),
            serde_json::to_string_pretty(results)?,
        );

        Ok(self
            .prompts
            .render_with_custom(&self.prompts.analyzer.user, &vars))
    }
}

/// Deterministic template answer built from the metric results alone.
///
/// Enumerates counts, top tags, comparison, and trend direction. Trend
/// direction is the sign of `(last - first) / first`; a zero first bucket
/// reads as "no change" rather than dividing by zero.
pub fn fallback_answer(results: &ResultBundle, plan: &AnalysisPlan) -> String {
    let mut parts = Vec::new();

    parts.push(format!(
        "Analysis for period: {} ({})",
        plan.time_period.description,
        plan.time_period.date_range()
    ));

    if results.is_no_data() {
        parts.push(
            "The system could not find enough call data for this period, so there is nothing to report."
                .to_string(),
        );
        return parts.join("\n");
    }

    parts.push(format!(
        "Calls analyzed: {}",
        results.summary_stats.total_calls
    ));

    if let Some(counts) = &results.count_by_tag {
        parts.push("Calls by tag:".to_string());
        if counts.is_empty() {
            parts.push("  (no calls matched the requested tags)".to_string());
        }
        for (tag, count) in counts {
            parts.push(format!("  - {}: {}", tag, count));
        }
    }

    if let Some(trends) = &results.tag_trends {
        for (tag, points) in trends {
            let Some(first) = points.first() else { continue };
            let Some(last) = points.last() else { continue };

            let (direction, change) = if first.count == 0 {
                ("no change", 0.0)
            } else {
                let change = (last.count as f64 - first.count as f64) / first.count as f64 * 100.0;
                if change > 0.0 {
                    ("rising", change)
                } else if change < 0.0 {
                    ("falling", change)
                } else {
                    ("no change", 0.0)
                }
            };

            parts.push(format!(
                "Trend for '{}': {} ({:.1}% from {} to {})",
                tag,
                direction,
                change.abs(),
                first.period,
                last.period
            ));
        }
    }

    if let Some(top) = &results.top_n_tags {
        if !top.is_empty() {
            parts.push("Most frequent tags:".to_string());
            for (i, entry) in top.iter().enumerate() {
                parts.push(format!("  {}. {}: {}", i + 1, entry.tag, entry.count));
            }
        }
    }

    if let Some(cmp) = &results.comparison {
        parts.push(format!(
            "Comparison: '{}' {} vs '{}' {} (ratio {:.2}, {} calls total)",
            cmp.tag1.name.as_deref().unwrap_or("-"),
            cmp.tag1.count,
            cmp.tag2.name.as_deref().unwrap_or("-"),
            cmp.tag2.count,
            cmp.ratio,
            cmp.total_calls
        ));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, RingeError};
    use crate::metrics::{SummaryStats, TagCount, TrendPoint};
    use crate::plan::{Grouping, MetricKind, TimePeriod};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    struct StubGenerator {
        response: std::result::Result<String, String>,
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
            self.response.clone().map_err(RingeError::Llm)
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn plan() -> AnalysisPlan {
        AnalysisPlan {
            time_period: TimePeriod {
                start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap(),
                description: "первые два месяца".to_string(),
            },
            target_tags: vec!["погашение_долга".to_string()],
            metrics: vec![MetricKind::CountByTag, MetricKind::TagTrends],
            grouping: Grouping::Month,
            comparison_tags: Vec::new(),
        }
    }

    fn bundle_with_trend(first: u64, last: u64) -> ResultBundle {
        let mut counts = BTreeMap::new();
        counts.insert("погашение_долга".to_string(), first + last);

        let mut trends = BTreeMap::new();
        trends.insert(
            "погашение_долга".to_string(),
            vec![
                TrendPoint { period: "2024-01".to_string(), count: first },
                TrendPoint { period: "2024-02".to_string(), count: last },
            ],
        );

        ResultBundle {
            error: None,
            count_by_tag: Some(counts),
            tag_trends: Some(trends),
            top_n_tags: Some(vec![TagCount {
                tag: "погашение_долга".to_string(),
                count: first + last,
            }]),
            comparison: None,
            summary_stats: SummaryStats {
                total_calls: first + last,
                period: "первые два месяца".to_string(),
                date_range: "2024-01-01 - 2024-02-28".to_string(),
            },
        }
    }

    #[test]
    fn test_fallback_reports_numbers() {
        let answer = fallback_answer(&bundle_with_trend(4, 2), &plan());
        assert!(answer.contains("погашение_долга: 6"));
        assert!(answer.contains("falling"));
        assert!(answer.contains("50.0%"));
        assert!(answer.contains("первые два месяца"));
    }

    #[test]
    fn test_fallback_trend_directions() {
        assert!(fallback_answer(&bundle_with_trend(2, 4), &plan()).contains("rising"));
        assert!(fallback_answer(&bundle_with_trend(3, 3), &plan()).contains("no change"));
        // A zero first bucket must not divide by zero.
        assert!(fallback_answer(&bundle_with_trend(0, 5), &plan()).contains("no change"));
    }

    #[test]
    fn test_fallback_no_data() {
        let mut bundle = bundle_with_trend(0, 0);
        bundle.error = Some("no data".to_string());
        bundle.count_by_tag = None;
        bundle.tag_trends = None;
        bundle.top_n_tags = None;

        let answer = fallback_answer(&bundle, &plan());
        assert!(answer.contains("could not find enough call data"));
        assert!(!answer.contains("Calls by tag"));
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_fallback() {
        let engine = AnswerEngine::new(
            std::sync::Arc::new(StubGenerator {
                response: Err("timeout".to_string()),
            }),
            Prompts::default(),
        );

        let answer = engine
            .generate_answer("сколько долгов погасили?", &bundle_with_trend(4, 2), &plan())
            .await;
        assert!(answer.contains("погашение_долга: 6"));
    }

    #[tokio::test]
    async fn test_empty_llm_answer_degrades_to_fallback() {
        let engine = AnswerEngine::new(
            std::sync::Arc::new(StubGenerator {
                response: Ok("   ".to_string()),
            }),
            Prompts::default(),
        );

        let answer = engine
            .generate_answer("сколько?", &bundle_with_trend(1, 1), &plan())
            .await;
        assert!(answer.contains("Calls analyzed: 2"));
    }

    #[tokio::test]
    async fn test_llm_answer_passes_through() {
        let engine = AnswerEngine::new(
            std::sync::Arc::new(StubGenerator {
                response: Ok("За два месяца погашено 6 долгов.".to_string()),
            }),
            Prompts::default(),
        );

        let answer = engine
            .generate_answer("сколько?", &bundle_with_trend(4, 2), &plan())
            .await;
        assert_eq!(answer, "За два месяца погашено 6 долгов.");
    }
}
