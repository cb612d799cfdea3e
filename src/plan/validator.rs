//! Plan validation and normalization.
//!
//! Planner output is whatever the LLM produced: fields may be missing,
//! empty, or malformed. Everything here degrades to documented defaults
//! instead of failing; a single bad field must not abort the query.

use super::{AnalysisPlan, Grouping, MetricKind, TimePeriod};
use crate::tags::match_tag;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

/// Loosely-typed planner response, as deserialized from the LLM's JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub time_period: Option<RawTimePeriod>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub grouping: Option<String>,
    #[serde(default)]
    pub comparison_tags: Vec<String>,
}

/// Raw `time_period` object from the planner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimePeriod {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Everything the validator needs besides the raw plan itself.
pub struct PlanContext<'a> {
    /// Canonical tag vocabulary.
    pub vocabulary: &'a [String],
    /// Substituted when no candidate tag validates.
    pub fallback_tag: &'a str,
    /// Trailing window for missing/unparseable periods.
    pub default_window_days: u32,
    /// Anchor for the default window; injected for testability.
    pub now: DateTime<Utc>,
}

/// Normalize a raw planner response into a well-formed plan.
pub fn normalize(raw: RawPlan, ctx: &PlanContext) -> AnalysisPlan {
    let time_period = parse_time_period(raw.time_period.as_ref(), ctx);
    let target_tags = validate_tags(&raw.target_tags, ctx);
    let metrics = parse_metrics(&raw.metrics);

    let grouping = raw
        .grouping
        .as_deref()
        .map(Grouping::parse)
        .unwrap_or_default();

    let comparison_tags: Vec<String> = raw
        .comparison_tags
        .iter()
        .filter_map(|candidate| match match_tag(candidate, ctx.vocabulary) {
            Some(canonical) => Some(canonical.to_string()),
            None => {
                debug!("Dropping unknown comparison tag {:?}", candidate);
                None
            }
        })
        .collect();

    AnalysisPlan {
        time_period,
        target_tags,
        metrics,
        grouping,
        comparison_tags,
    }
}

/// Resolve the analysis window.
///
/// ISO-8601 `start`/`end` strings are honored when parseable; anything
/// missing or malformed falls back to the default trailing window anchored
/// on `ctx.now`. A reversed range is normalized by swapping. The
/// description defaults to the formatted resolved range.
pub fn parse_time_period(raw: Option<&RawTimePeriod>, ctx: &PlanContext) -> TimePeriod {
    let default_start = ctx.now - Duration::days(ctx.default_window_days as i64);

    let (raw_start, raw_end, raw_description) = match raw {
        Some(p) => (p.start.as_deref(), p.end.as_deref(), p.description.clone()),
        None => (None, None, None),
    };

    let mut start = raw_start.and_then(parse_iso_date).unwrap_or(default_start);
    let mut end = raw_end.and_then(parse_iso_date).unwrap_or(ctx.now);

    if start > end {
        debug!("Reversed time period {} > {}, swapping", start, end);
        std::mem::swap(&mut start, &mut end);
    }

    let description = raw_description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            format!("{} - {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        });

    TimePeriod {
        start,
        end,
        description,
    }
}

/// Parse a planner date string: bare date, `T`-separated datetime, or
/// RFC 3339.
fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    debug!("Unparseable planner date {:?}", raw);
    None
}

/// Rewrite candidate tags to canonical vocabulary entries.
///
/// Non-matching candidates are dropped with a diagnostic; an empty result
/// is replaced by the configured fallback tag so metric execution never
/// filters on an empty tag set.
pub fn validate_tags(candidates: &[String], ctx: &PlanContext) -> Vec<String> {
    let valid: Vec<String> = candidates
        .iter()
        .filter_map(|candidate| match match_tag(candidate, ctx.vocabulary) {
            Some(canonical) => Some(canonical.to_string()),
            None => {
                debug!("Dropping unknown tag candidate {:?}", candidate);
                None
            }
        })
        .collect();

    if valid.is_empty() {
        vec![ctx.fallback_tag.to_string()]
    } else {
        valid
    }
}

/// Map metric string literals to kinds, ignoring unknown literals and
/// duplicates; an empty result defaults to `count_by_tag`.
pub fn parse_metrics(raw: &[String]) -> Vec<MetricKind> {
    let mut metrics = Vec::new();
    for literal in raw {
        match MetricKind::parse(literal) {
            Some(kind) if !metrics.contains(&kind) => metrics.push(kind),
            Some(_) => {}
            None => debug!("Ignoring unknown metric {:?}", literal),
        }
    }

    if metrics.is_empty() {
        metrics.push(MetricKind::CountByTag);
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(vocab: &[String]) -> PlanContext<'_> {
        PlanContext {
            vocabulary: vocab,
            fallback_tag: "низкое_качество_стирки_или_чистки",
            default_window_days: 30,
            now: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        }
    }

    fn vocab() -> Vec<String> {
        vec![
            "низкое_качество_стирки_или_чистки".to_string(),
            "долго_нет_ответа_на_заявку".to_string(),
            "погашение_долга".to_string(),
        ]
    }

    #[test]
    fn test_explicit_period_is_honored() {
        let vocab = vocab();
        let raw = RawTimePeriod {
            description: Some("первый квартал".to_string()),
            start: Some("2024-01-01".to_string()),
            end: Some("2024-03-31".to_string()),
        };
        let period = parse_time_period(Some(&raw), &ctx(&vocab));
        assert_eq!(period.date_range(), "2024-01-01 - 2024-03-31");
        assert_eq!(period.description, "первый квартал");
    }

    #[test]
    fn test_missing_period_uses_default_window() {
        let vocab = vocab();
        let c = ctx(&vocab);
        let period = parse_time_period(None, &c);
        assert_eq!(period.end, c.now);
        assert_eq!(period.start, c.now - Duration::days(30));
        assert_eq!(period.description, "2024-05-16 - 2024-06-15");
    }

    #[test]
    fn test_malformed_dates_fall_back_per_field() {
        let vocab = vocab();
        let c = ctx(&vocab);
        let raw = RawTimePeriod {
            description: None,
            start: Some("не дата".to_string()),
            end: Some("2024-06-01".to_string()),
        };
        let period = parse_time_period(Some(&raw), &c);
        assert_eq!(period.start, c.now - Duration::days(30));
        assert_eq!(
            period.end,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_reversed_period_is_swapped() {
        let vocab = vocab();
        let raw = RawTimePeriod {
            description: None,
            start: Some("2024-03-01".to_string()),
            end: Some("2024-01-01".to_string()),
        };
        let period = parse_time_period(Some(&raw), &ctx(&vocab));
        assert!(period.start <= period.end);
        assert_eq!(period.date_range(), "2024-01-01 - 2024-03-01");
    }

    #[test]
    fn test_tags_rewritten_to_canonical() {
        let vocab = vocab();
        let tags = validate_tags(
            &["качество".to_string(), "выдуманный_тег".to_string()],
            &ctx(&vocab),
        );
        assert_eq!(tags, vec!["низкое_качество_стирки_или_чистки"]);
    }

    #[test]
    fn test_empty_tags_get_fallback() {
        let vocab = vocab();
        let tags = validate_tags(&[], &ctx(&vocab));
        assert_eq!(tags, vec!["низкое_качество_стирки_или_чистки"]);

        let tags = validate_tags(&["мимо".to_string()], &ctx(&vocab));
        assert_eq!(tags, vec!["низкое_качество_стирки_или_чистки"]);
    }

    #[test]
    fn test_metrics_parsed_and_deduplicated() {
        let metrics = parse_metrics(&[
            "count_by_tag".to_string(),
            "tag_trends".to_string(),
            "count_by_tag".to_string(),
            "sentiment".to_string(),
        ]);
        assert_eq!(metrics, vec![MetricKind::CountByTag, MetricKind::TagTrends]);
    }

    #[test]
    fn test_empty_metrics_default_to_count() {
        assert_eq!(parse_metrics(&[]), vec![MetricKind::CountByTag]);
        assert_eq!(
            parse_metrics(&["unknown".to_string()]),
            vec![MetricKind::CountByTag]
        );
    }

    #[test]
    fn test_normalize_full_raw_plan() {
        let vocab = vocab();
        let raw = RawPlan {
            time_period: Some(RawTimePeriod {
                description: Some("последний месяц".to_string()),
                start: Some("2024-05-15".to_string()),
                end: Some("2024-06-15".to_string()),
            }),
            target_tags: vec!["долго_нет_ответа".to_string()],
            metrics: vec!["tag_trends".to_string()],
            grouping: Some("week".to_string()),
            comparison_tags: vec!["погашение".to_string(), "мимо".to_string()],
        };

        let plan = normalize(raw, &ctx(&vocab));
        assert_eq!(plan.target_tags, vec!["долго_нет_ответа_на_заявку"]);
        assert_eq!(plan.metrics, vec![MetricKind::TagTrends]);
        assert_eq!(plan.grouping, Grouping::Week);
        assert_eq!(plan.comparison_tags, vec!["погашение_долга"]);
    }
}
