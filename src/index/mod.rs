//! In-memory SQLite tag index.
//!
//! A derived, disposable mirror of the call collection for tag/date
//! lookups: one row per call plus an exploded `call_tags` table so tag
//! aggregation stays a plain indexed join. Safe to rebuild from the
//! collection at any time.

use crate::calls::CallRecord;
use crate::error::{Result, RingeError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite-backed tag/date index over the call collection.
pub struct TagIndex {
    conn: Mutex<Connection>,
}

impl TagIndex {
    /// Build the index from a call collection.
    #[instrument(skip_all)]
    pub fn build(calls: &[CallRecord]) -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch(
            r#"
            CREATE TABLE calls (
                id TEXT PRIMARY KEY,
                call_date TEXT NOT NULL,
                full_text TEXT NOT NULL,
                summary TEXT,
                tags_json TEXT NOT NULL,
                text_length INTEGER NOT NULL,
                source_file TEXT NOT NULL
            );

            CREATE TABLE call_tags (
                call_id TEXT NOT NULL,
                tag TEXT NOT NULL,
                FOREIGN KEY (call_id) REFERENCES calls(id)
            );

            CREATE INDEX idx_calls_date ON calls(call_date);
            CREATE INDEX idx_call_tags_tag ON call_tags(tag);
            "#,
        )?;

        {
            let tx = conn.unchecked_transaction()?;
            for call in calls {
                tx.execute(
                    r#"
                    INSERT INTO calls
                    (id, call_date, full_text, summary, tags_json, text_length, source_file)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        call.id,
                        call.call_date.to_rfc3339(),
                        call.full_text,
                        call.summary,
                        serde_json::to_string(&call.tags)?,
                        call.text_length as i64,
                        call.source_file,
                    ],
                )?;

                for tag in &call.tags {
                    tx.execute(
                        "INSERT INTO call_tags (call_id, tag) VALUES (?1, ?2)",
                        params![call.id, tag],
                    )?;
                }
            }
            tx.commit()?;
        }

        debug!("Indexed {} calls", calls.len());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RingeError::CallData(format!("Failed to acquire lock: {}", e)))
    }

    /// Total indexed calls.
    pub fn call_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM calls", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of distinct tag strings across all calls.
    pub fn unique_tag_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(DISTINCT tag) FROM call_tags", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Calls carrying an exact tag. Exact, not fuzzy: the index serves
    /// diagnostics, the metric engine owns fuzzy matching.
    pub fn count_with_tag(&self, tag: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT call_id) FROM call_tags WHERE tag = ?1",
            params![tag],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Most frequent tags with their counts, descending.
    pub fn top_tags(&self, limit: usize) -> Result<Vec<(String, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tag, COUNT(*) as count
            FROM call_tags
            GROUP BY tag
            ORDER BY count DESC, tag
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Oldest and newest call dates, or `None` for an empty index.
    pub fn date_range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let conn = self.lock()?;
        let range: (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(call_date), MAX(call_date) FROM calls",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match range {
            (Some(min), Some(max)) => {
                let min = DateTime::parse_from_rfc3339(&min)
                    .map_err(|e| RingeError::CallData(format!("Bad indexed date: {}", e)))?
                    .with_timezone(&Utc);
                let max = DateTime::parse_from_rfc3339(&max)
                    .map_err(|e| RingeError::CallData(format!("Bad indexed date: {}", e)))?
                    .with_timezone(&Utc);
                Ok(Some((min, max)))
            }
            _ => Ok(None),
        }
    }

    /// Mean transcript length in characters, 0 for an empty index.
    pub fn average_text_length(&self) -> Result<usize> {
        let conn = self.lock()?;
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(text_length) FROM calls",
            [],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn call(id: &str, date: (i32, u32, u32), tags: &[&str]) -> CallRecord {
        CallRecord::new(
            id.to_string(),
            Utc.with_ymd_and_hms(date.0, date.1, date.2, 0, 0, 0).unwrap(),
            "текст звонка".to_string(),
            None,
            tags.iter().map(|t| t.to_string()).collect(),
            format!("{}.json", id),
        )
    }

    #[test]
    fn test_counts_and_unique_tags() {
        let calls = vec![
            call("call_0", (2024, 1, 5), &["погашение_долга", "консультация"]),
            call("call_1", (2024, 2, 10), &["погашение_долга"]),
        ];

        let index = TagIndex::build(&calls).unwrap();
        assert_eq!(index.call_count().unwrap(), 2);
        assert_eq!(index.unique_tag_count().unwrap(), 2);
        assert_eq!(index.count_with_tag("погашение_долга").unwrap(), 2);
        assert_eq!(index.count_with_tag("консультация").unwrap(), 1);
        assert_eq!(index.count_with_tag("нет_такого").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_tags_count_once_per_call() {
        let calls = vec![call("call_0", (2024, 1, 5), &["долг", "долг"])];
        let index = TagIndex::build(&calls).unwrap();
        assert_eq!(index.count_with_tag("долг").unwrap(), 1);
    }

    #[test]
    fn test_top_tags_ordering() {
        let calls = vec![
            call("call_0", (2024, 1, 5), &["а", "б"]),
            call("call_1", (2024, 1, 6), &["б"]),
        ];
        let index = TagIndex::build(&calls).unwrap();
        let top = index.top_tags(5).unwrap();
        assert_eq!(top[0], ("б".to_string(), 2));
        assert_eq!(top[1], ("а".to_string(), 1));
    }

    #[test]
    fn test_date_range() {
        let calls = vec![
            call("call_0", (2024, 1, 5), &[]),
            call("call_1", (2024, 3, 1), &[]),
        ];
        let index = TagIndex::build(&calls).unwrap();
        let (min, max) = index.date_range().unwrap().unwrap();
        assert_eq!(min, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(max, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_empty_index() {
        let index = TagIndex::build(&[]).unwrap();
        assert_eq!(index.call_count().unwrap(), 0);
        assert!(index.date_range().unwrap().is_none());
        assert_eq!(index.average_text_length().unwrap(), 0);
    }
}
