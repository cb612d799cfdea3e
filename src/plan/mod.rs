//! Analysis plans: the validated, structured intent behind a
//! natural-language analytics query.

mod validator;

pub use validator::{
    normalize, parse_metrics, parse_time_period, validate_tags, PlanContext, RawPlan,
    RawTimePeriod,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default trailing window, in days, when a query carries no usable period.
///
/// The upstream behavior diverged between 30 days, 6 months, and "last
/// month" depending on the code path; a single overridable constant is used
/// everywhere instead (see DESIGN.md).
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// One aggregate computation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Calls per target tag over the period.
    CountByTag,
    /// Most frequent tags over the period.
    TopNTags,
    /// Per-tag counts bucketed by day/week/month.
    TagTrends,
    /// Two-tag comparison.
    Comparison,
}

impl MetricKind {
    /// Map a planner string literal to a metric kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "count_by_tag" => Some(MetricKind::CountByTag),
            "top_n_tags" => Some(MetricKind::TopNTags),
            "tag_trends" => Some(MetricKind::TagTrends),
            "comparison" => Some(MetricKind::Comparison),
            _ => None,
        }
    }

    /// The wire name used in planner output and result bundles.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CountByTag => "count_by_tag",
            MetricKind::TopNTags => "top_n_tags",
            MetricKind::TagTrends => "tag_trends",
            MetricKind::Comparison => "comparison",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-bucket granularity for trend metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    Day,
    Week,
    #[default]
    Month,
}

impl Grouping {
    /// Parse a planner string, defaulting to month for anything unknown.
    pub fn parse(s: &str) -> Self {
        match s {
            "day" => Grouping::Day,
            "week" => Grouping::Week,
            _ => Grouping::Month,
        }
    }
}

/// The analysis window, inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Planner-supplied description, e.g. "последние 6 месяцев".
    pub description: String,
}

impl TimePeriod {
    /// Formatted `YYYY-MM-DD - YYYY-MM-DD` range.
    pub fn date_range(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Validated query intent. Invariants: `time_period.start <= time_period.end`
/// and `target_tags` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPlan {
    pub time_period: TimePeriod,
    /// Canonical vocabulary entries, at least one.
    pub target_tags: Vec<String>,
    /// Deduplicated, at least one.
    pub metrics: Vec<MetricKind>,
    pub grouping: Grouping,
    /// Pair for COMPARISON; the executor falls back to the first two
    /// target tags when empty.
    #[serde(default)]
    pub comparison_tags: Vec<String>,
}
