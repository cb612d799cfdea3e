//! Metric execution over the call collection.
//!
//! A validated plan is applied to the in-memory calls: one period filter,
//! then exactly the requested metrics. Execution is pure and never fails on
//! empty or missing data; degenerate inputs produce a flagged result bundle
//! instead of an error.

use crate::calls::CallRecord;
use crate::plan::{AnalysisPlan, Grouping, MetricKind, TimePeriod};
use crate::tags::tags_match;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// One trend bucket. Only periods with at least one match are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: u64,
}

/// One entry of the top-N list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// One side of a two-tag comparison. `name` is null when the planner
/// supplied fewer than two tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSide {
    pub name: Option<String>,
    pub count: u64,
}

/// Two-tag comparison record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub tag1: ComparisonSide,
    pub tag2: ComparisonSide,
    pub total_calls: u64,
    /// `count(tag1) / count(tag2)`, defined as 0 when the denominator is 0.
    pub ratio: f64,
}

/// Always-present execution statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_calls: u64,
    pub period: String,
    pub date_range: String,
}

/// Everything one plan execution produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Set to "no data" when the collection was empty before filtering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_by_tag: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_trends: Option<BTreeMap<String, Vec<TrendPoint>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n_tags: Option<Vec<TagCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    pub summary_stats: SummaryStats,
}

impl ResultBundle {
    fn empty(summary_stats: SummaryStats) -> Self {
        Self {
            error: None,
            count_by_tag: None,
            tag_trends: None,
            top_n_tags: None,
            comparison: None,
            summary_stats,
        }
    }

    /// Whether execution short-circuited on an empty collection.
    pub fn is_no_data(&self) -> bool {
        self.error.is_some()
    }
}

/// Inclusive `[start, end]` filter on the call date.
pub fn filter_by_period<'a>(calls: &'a [CallRecord], period: &TimePeriod) -> Vec<&'a CallRecord> {
    calls
        .iter()
        .filter(|call| call.call_date >= period.start && call.call_date <= period.end)
        .collect()
}

/// Count calls per target tag.
///
/// Each tag occurrence on a call is tested against the targets in
/// target-list order; the first fuzzy match takes the count and ends the
/// scan for that occurrence, so an ambiguous tag never counts against two
/// targets. Targets with no matches are absent from the result.
pub fn count_by_tag(calls: &[&CallRecord], target_tags: &[String]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();

    for call in calls {
        for tag in &call.tags {
            for target in target_tags {
                if tags_match(tag, target) {
                    *counts.entry(target.clone()).or_insert(0) += 1;
                    break;
                }
            }
        }
    }

    counts
}

/// Per-tag counts bucketed by period.
///
/// Bucket keys are `YYYY-MM` (month), ISO `YYYY-Www` (week), or
/// `YYYY-MM-DD` (day); lexicographic key order is chronological. Empty
/// buckets are not emitted.
pub fn tag_trends(
    calls: &[&CallRecord],
    target_tags: &[String],
    grouping: Grouping,
) -> BTreeMap<String, Vec<TrendPoint>> {
    if target_tags.is_empty() || calls.is_empty() {
        return BTreeMap::new();
    }

    let mut buckets: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

    for call in calls {
        let period_key = period_key(call, grouping);
        for tag in &call.tags {
            for target in target_tags {
                if tags_match(tag, target) {
                    *buckets
                        .entry(target.clone())
                        .or_default()
                        .entry(period_key.clone())
                        .or_insert(0) += 1;
                    break;
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|(tag, periods)| {
            let points = periods
                .into_iter()
                .map(|(period, count)| TrendPoint { period, count })
                .collect();
            (tag, points)
        })
        .collect()
}

fn period_key(call: &CallRecord, grouping: Grouping) -> String {
    match grouping {
        Grouping::Month => call.call_date.format("%Y-%m").to_string(),
        Grouping::Week => {
            let week = call.call_date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Grouping::Day => call.call_date.format("%Y-%m-%d").to_string(),
    }
}

/// Most frequent literal tag strings across the calls.
///
/// No fuzzy merging: distinct spellings are distinct entries. Ties keep
/// first-encounter order.
pub fn top_n_tags(calls: &[&CallRecord], n: usize) -> Vec<TagCount> {
    let mut entries: Vec<TagCount> = Vec::new();

    for call in calls {
        for tag in &call.tags {
            match entries.iter_mut().find(|e| e.tag == *tag) {
                Some(entry) => entry.count += 1,
                None => entries.push(TagCount {
                    tag: tag.clone(),
                    count: 1,
                }),
            }
        }
    }

    // Stable sort: equal counts stay in encounter order.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(n);
    entries
}

/// Compare two tags over the calls.
///
/// A missing second (or first) tag is padded with a null slot counted as
/// 0; the ratio is 0 whenever the second count is 0.
pub fn compare_tags(calls: &[&CallRecord], tags: &[String]) -> Comparison {
    let pair: Vec<Option<&String>> = (0..2).map(|i| tags.get(i)).collect();

    let real_tags: Vec<String> = pair.iter().flatten().map(|t| (*t).clone()).collect();
    let counts = count_by_tag(calls, &real_tags);

    let side = |tag: Option<&String>| -> ComparisonSide {
        ComparisonSide {
            name: tag.cloned(),
            count: tag.and_then(|t| counts.get(t)).copied().unwrap_or(0),
        }
    };

    let tag1 = side(pair[0]);
    let tag2 = side(pair[1]);

    let ratio = if tag2.count > 0 {
        tag1.count as f64 / tag2.count as f64
    } else {
        0.0
    };

    Comparison {
        tag1,
        tag2,
        total_calls: calls.len() as u64,
        ratio,
    }
}

/// Execute a validated plan over the full call collection.
///
/// An empty collection short-circuits to an explicit "no data" bundle;
/// otherwise the period filter runs once and exactly the requested metrics
/// are computed.
#[instrument(skip(plan, calls), fields(metrics = plan.metrics.len()))]
pub fn execute_plan(plan: &AnalysisPlan, calls: &[CallRecord], top_n: usize) -> ResultBundle {
    if calls.is_empty() {
        debug!("Empty call collection, short-circuiting");
        let mut bundle = ResultBundle::empty(SummaryStats {
            total_calls: 0,
            period: plan.time_period.description.clone(),
            date_range: plan.time_period.date_range(),
        });
        bundle.error = Some("no data".to_string());
        return bundle;
    }

    let filtered = filter_by_period(calls, &plan.time_period);
    debug!("{} of {} calls in period", filtered.len(), calls.len());

    let mut bundle = ResultBundle::empty(SummaryStats {
        total_calls: filtered.len() as u64,
        period: plan.time_period.description.clone(),
        date_range: plan.time_period.date_range(),
    });

    for metric in &plan.metrics {
        match metric {
            MetricKind::CountByTag => {
                bundle.count_by_tag = Some(count_by_tag(&filtered, &plan.target_tags));
            }
            MetricKind::TagTrends => {
                bundle.tag_trends = Some(tag_trends(&filtered, &plan.target_tags, plan.grouping));
            }
            MetricKind::TopNTags => {
                bundle.top_n_tags = Some(top_n_tags(&filtered, top_n));
            }
            MetricKind::Comparison => {
                let tags: &[String] = if plan.comparison_tags.is_empty() {
                    &plan.target_tags[..plan.target_tags.len().min(2)]
                } else {
                    &plan.comparison_tags
                };
                bundle.comparison = Some(compare_tags(&filtered, tags));
            }
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn call(id: usize, date: (i32, u32, u32), tags: &[&str]) -> CallRecord {
        CallRecord::new(
            format!("call_{}", id),
            Utc.with_ymd_and_hms(date.0, date.1, date.2, 0, 0, 0).unwrap(),
            "текст".to_string(),
            None,
            tags.iter().map(|t| t.to_string()).collect(),
            format!("call_{}.json", id),
        )
    }

    fn period(start: (i32, u32, u32), end: (i32, u32, u32)) -> TimePeriod {
        TimePeriod {
            start: Utc.with_ymd_and_hms(start.0, start.1, start.2, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(end.0, end.1, end.2, 0, 0, 0).unwrap(),
            description: "тестовый период".to_string(),
        }
    }

    fn plan(p: TimePeriod, targets: &[&str], metrics: Vec<MetricKind>) -> AnalysisPlan {
        AnalysisPlan {
            time_period: p,
            target_tags: targets.iter().map(|t| t.to_string()).collect(),
            metrics,
            grouping: Grouping::Month,
            comparison_tags: Vec::new(),
        }
    }

    #[test]
    fn test_monthly_trends_and_counts() {
        // Three calls, two in the target tag, one outside it.
        let calls = vec![
            call(0, (2024, 1, 5), &["долго_нет_ответа"]),
            call(1, (2024, 2, 10), &["долго_нет_ответа"]),
            call(2, (2024, 2, 20), &["погашение_долга"]),
        ];
        let plan = plan(
            period((2024, 1, 1), (2024, 2, 28)),
            &["долго_нет_ответа"],
            vec![MetricKind::CountByTag, MetricKind::TagTrends],
        );

        let bundle = execute_plan(&plan, &calls, 5);
        assert!(!bundle.is_no_data());
        assert_eq!(bundle.summary_stats.total_calls, 3);

        let counts = bundle.count_by_tag.unwrap();
        assert_eq!(counts.get("долго_нет_ответа"), Some(&2));

        let trends = bundle.tag_trends.unwrap();
        assert_eq!(
            trends.get("долго_нет_ответа").unwrap(),
            &vec![
                TrendPoint { period: "2024-01".to_string(), count: 1 },
                TrendPoint { period: "2024-02".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_period_filter_is_inclusive_and_excludes_outside() {
        let calls = vec![
            call(0, (2024, 1, 1), &["погашение_долга"]),
            call(1, (2024, 1, 31), &["погашение_долга"]),
            call(2, (2024, 2, 1), &["погашение_долга"]),
        ];
        let plan = plan(
            period((2024, 1, 1), (2024, 1, 31)),
            &["погашение_долга"],
            vec![MetricKind::CountByTag],
        );

        let bundle = execute_plan(&plan, &calls, 5);
        assert_eq!(bundle.summary_stats.total_calls, 2);
        assert_eq!(bundle.count_by_tag.unwrap().get("погашение_долга"), Some(&2));
    }

    #[test]
    fn test_empty_collection_short_circuits() {
        let plan = plan(
            period((2024, 1, 1), (2024, 2, 28)),
            &["погашение_долга"],
            vec![MetricKind::CountByTag, MetricKind::TagTrends],
        );

        let bundle = execute_plan(&plan, &[], 5);
        assert!(bundle.is_no_data());
        assert_eq!(bundle.error.as_deref(), Some("no data"));
        assert_eq!(bundle.summary_stats.total_calls, 0);
        assert!(bundle.count_by_tag.is_none());
    }

    #[test]
    fn test_trends_omit_empty_buckets_and_sort_keys() {
        // January and March have matches, February does not.
        let calls = vec![
            call(0, (2024, 3, 5), &["консультация"]),
            call(1, (2024, 1, 10), &["консультация"]),
        ];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let trends = tag_trends(&refs, &["консультация".to_string()], Grouping::Month);
        let points = trends.get("консультация").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].period, "2024-01");
        assert_eq!(points[1].period, "2024-03");
        assert!(points.iter().all(|p| p.count > 0));
    }

    #[test]
    fn test_week_and_day_period_keys() {
        // 2024-01-01 is a Monday, ISO week 1.
        let calls = vec![call(0, (2024, 1, 1), &["консультация"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();
        let target = vec!["консультация".to_string()];

        let weekly = tag_trends(&refs, &target, Grouping::Week);
        assert_eq!(weekly.get("консультация").unwrap()[0].period, "2024-W01");

        let daily = tag_trends(&refs, &target, Grouping::Day);
        assert_eq!(daily.get("консультация").unwrap()[0].period, "2024-01-01");
    }

    #[test]
    fn test_iso_week_year_boundary() {
        // 2024-12-30 belongs to ISO week 1 of 2025.
        let calls = vec![call(0, (2024, 12, 30), &["консультация"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let weekly = tag_trends(&refs, &["консультация".to_string()], Grouping::Week);
        assert_eq!(weekly.get("консультация").unwrap()[0].period, "2025-W01");
    }

    #[test]
    fn test_trends_empty_inputs() {
        let calls = vec![call(0, (2024, 1, 1), &["консультация"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        assert!(tag_trends(&refs, &[], Grouping::Month).is_empty());
        assert!(tag_trends(&[], &["консультация".to_string()], Grouping::Month).is_empty());
    }

    #[test]
    fn test_ambiguous_tag_counts_against_first_target_only() {
        // The call tag fuzzily matches both targets; only the first target
        // in list order takes the count.
        let calls = vec![call(0, (2024, 1, 5), &["жалоба_доставка_долго"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let targets = vec!["доставка".to_string(), "долго".to_string()];
        let counts = count_by_tag(&refs, &targets);
        assert_eq!(counts.get("доставка"), Some(&1));
        assert_eq!(counts.get("долго"), None);
    }

    #[test]
    fn test_call_with_distinct_tags_counts_toward_multiple_targets() {
        let calls = vec![call(0, (2024, 1, 5), &["доставка", "оплата"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let targets = vec!["доставка".to_string(), "оплата".to_string()];
        let counts = count_by_tag(&refs, &targets);
        assert_eq!(counts.get("доставка"), Some(&1));
        assert_eq!(counts.get("оплата"), Some(&1));
    }

    #[test]
    fn test_top_n_ties_preserve_encounter_order() {
        let calls = vec![
            call(0, (2024, 1, 1), &["б", "а"]),
            call(1, (2024, 1, 2), &["б", "а"]),
            call(2, (2024, 1, 3), &["а", "б", "в"]),
        ];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let top = top_n_tags(&refs, 2);
        assert_eq!(top.len(), 2);
        // "б" and "а" both have count 3; "б" was encountered first.
        assert_eq!(top[0], TagCount { tag: "б".to_string(), count: 3 });
        assert_eq!(top[1], TagCount { tag: "а".to_string(), count: 3 });
    }

    #[test]
    fn test_top_n_is_literal_not_fuzzy() {
        let calls = vec![call(0, (2024, 1, 1), &["долг", "погашение_долга"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let top = top_n_tags(&refs, 5);
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_comparison_ratio_zero_denominator() {
        let calls = vec![call(0, (2024, 1, 5), &["доставка"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let cmp = compare_tags(
            &refs,
            &["доставка".to_string(), "оплата".to_string()],
        );
        assert_eq!(cmp.tag1.count, 1);
        assert_eq!(cmp.tag2.count, 0);
        assert_eq!(cmp.ratio, 0.0);
        assert_eq!(cmp.total_calls, 1);
    }

    #[test]
    fn test_comparison_pads_missing_tag() {
        let calls = vec![call(0, (2024, 1, 5), &["доставка"])];
        let refs: Vec<&CallRecord> = calls.iter().collect();

        let cmp = compare_tags(&refs, &["доставка".to_string()]);
        assert_eq!(cmp.tag1.name.as_deref(), Some("доставка"));
        assert_eq!(cmp.tag2.name, None);
        assert_eq!(cmp.tag2.count, 0);
        assert_eq!(cmp.ratio, 0.0);
    }

    #[test]
    fn test_comparison_uses_target_tags_when_pair_missing() {
        let calls = vec![
            call(0, (2024, 1, 5), &["доставка"]),
            call(1, (2024, 1, 6), &["доставка"]),
            call(2, (2024, 1, 7), &["оплата"]),
        ];
        let mut p = plan(
            period((2024, 1, 1), (2024, 1, 31)),
            &["доставка", "оплата"],
            vec![MetricKind::Comparison],
        );
        p.comparison_tags = Vec::new();

        let bundle = execute_plan(&p, &calls, 5);
        let cmp = bundle.comparison.unwrap();
        assert_eq!(cmp.tag1.count, 2);
        assert_eq!(cmp.tag2.count, 1);
        assert_eq!(cmp.ratio, 2.0);
    }
}
