//! Fuzzy tag matching against the fixed vocabulary.
//!
//! Tags on calls are short snake_case labels from an externally supplied
//! vocabulary. Both the plan validator and the metric engine match tags by
//! case-insensitive substring containment in either direction, so a planner
//! candidate like "качество" resolves to the canonical
//! "низкое_качество_стирки_или_чистки" entry.
//!
//! The bidirectional substring heuristic can over-match when one vocabulary
//! entry is a short prefix of another. That behavior is intentional and must
//! not be tightened here; downstream counting depends on it.

/// Check whether two tag strings match fuzzily.
///
/// True when the lowercased form of either string contains the other.
pub fn tags_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Resolve a candidate tag to its canonical vocabulary entry.
///
/// Returns the first vocabulary entry that fuzzily matches the candidate,
/// scanning in vocabulary order, or `None` if nothing matches.
pub fn match_tag<'a>(candidate: &str, vocabulary: &'a [String]) -> Option<&'a str> {
    vocabulary
        .iter()
        .find(|entry| tags_match(candidate, entry))
        .map(|entry| entry.as_str())
}
