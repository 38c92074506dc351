//! Splits a model-emitted location list into individual mentions.
//!
//! Convention: `[City, Country; City, State, Country; Region]`.
//! Semicolons separate locations, commas separate the hierarchy
//! levels of a single location, brackets are optional decoration.

use super::types::LocationMention;

/// Phrase the extraction prompt asks for when an article names no place.
pub const NO_LOCATIONS_SENTINEL: &str = "No specific locations mentioned";

/// Split a raw location list into trimmed, non-empty mention strings.
pub fn split_locations(raw: &str) -> Vec<String> {
    let unbracketed: String = raw.chars().filter(|c| !matches!(c, '[' | ']')).collect();

    unbracketed
        .split(';')
        .map(str::trim)
        .filter(|group| !group.is_empty() && !is_sentinel(group))
        .map(str::to_string)
        .collect()
}

/// Split a raw location list and tag each mention with its source.
pub fn split_mentions(source_id: &str, raw: &str) -> Vec<LocationMention> {
    split_locations(raw)
        .into_iter()
        .enumerate()
        .map(|(sequence_index, raw_text)| LocationMention {
            source_id: source_id.to_string(),
            raw_text,
            sequence_index,
        })
        .collect()
}

fn is_sentinel(group: &str) -> bool {
    let g = group.trim_end_matches('.').trim();
    g.eq_ignore_ascii_case(NO_LOCATIONS_SENTINEL)
}
