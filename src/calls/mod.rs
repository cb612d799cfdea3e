//! Call records and their sources.
//!
//! A call record is one normalized unit of contact history: a phone
//! transcript or a written message, with a date, text, and tags from the
//! fixed vocabulary.

mod date;
mod loader;
mod store;

pub use date::extract_date_from_filename;
pub use loader::{load_csv_file, load_json_dir, parse_tag_list};
pub use store::{CallSource, CallStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One phone call or written contact.
///
/// Created once during a load pass and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Stable identifier, unique within a load (`call_<n>` by load order).
    pub id: String,
    /// When the contact happened. Never null; see [`extract_date_from_filename`]
    /// for the derivation order.
    pub call_date: DateTime<Utc>,
    /// Transcript text; may be empty.
    pub full_text: String,
    /// Short reason/description when the source provides one.
    pub summary: Option<String>,
    /// Tags from the fixed vocabulary. Duplicates within one call are kept
    /// as-is; downstream counting is frequency-sensitive.
    pub tags: Vec<String>,
    /// Derived length of `full_text` in characters.
    pub text_length: usize,
    /// Provenance pointer, used for diagnostics only.
    pub source_file: String,
}

impl CallRecord {
    /// Build a record, deriving `text_length` from the text.
    pub fn new(
        id: String,
        call_date: DateTime<Utc>,
        full_text: String,
        summary: Option<String>,
        tags: Vec<String>,
        source_file: String,
    ) -> Self {
        let text_length = full_text.chars().count();
        Self {
            id,
            call_date,
            full_text,
            summary,
            tags,
            text_length,
            source_file,
        }
    }
}
