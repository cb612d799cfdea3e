//! Call date derivation.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn iso_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("Invalid regex"))
}

fn dotted_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").expect("Invalid regex"))
}

fn compact_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").expect("Invalid regex"))
}

/// Extract the call date from a file name.
///
/// Priority order: a `YYYY-MM-DD` substring, then `DD.MM.YYYY`, then
/// `YYYYMMDD`; failing those, the file's modification time; failing that,
/// the current time. Never fails.
pub fn extract_date_from_filename(path: &Path) -> DateTime<Utc> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(date) = date_from_name(&filename) {
        return date;
    }

    if let Ok(meta) = std::fs::metadata(path) {
        if let Ok(modified) = meta.modified() {
            return DateTime::<Utc>::from(modified);
        }
    }

    Utc::now()
}

fn date_from_name(filename: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = iso_pattern().captures(filename) {
        return midnight_utc(&caps[1], &caps[2], &caps[3]);
    }
    if let Some(caps) = dotted_pattern().captures(filename) {
        return midnight_utc(&caps[3], &caps[2], &caps[1]);
    }
    if let Some(caps) = compact_pattern().captures(filename) {
        return midnight_utc(&caps[1], &caps[2], &caps[3]);
    }
    None
}

/// Midnight UTC for the given date components; `None` for impossible dates
/// (e.g. a `20251340` substring that happens to match the compact pattern).
fn midnight_utc(year: &str, month: &str, day: &str) -> Option<DateTime<Utc>> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_iso_date_in_filename() {
        let date = date_from_name("call_2024-03-15_manager.json").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
    }

    #[test]
    fn test_dotted_date_in_filename() {
        let date = date_from_name("15.03.2024_call.json").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
    }

    #[test]
    fn test_compact_date_in_filename() {
        let date = date_from_name("rec20240315.json").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
    }

    #[test]
    fn test_iso_takes_priority_over_compact() {
        let date = date_from_name("20230101_2024-03-15.json").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
    }

    #[test]
    fn test_impossible_compact_date_rejected() {
        assert!(date_from_name("rec20251340.json").is_none());
    }

    #[test]
    fn test_no_date_in_name() {
        assert!(date_from_name("call_recording.json").is_none());
    }
}
