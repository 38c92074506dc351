//! Pulls labelled fields out of free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;

static EVENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)Event Type:\s*(.*)$").unwrap());
static ENTITIES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)Entities:\s*(.*)$").unwrap());
static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());
static LOCATIONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)Event Locations?:\s*(\[.*?\])").unwrap());
static LOCATIONS_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)Event Locations?:\s*(.*)$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Phone Numbers:\s*(.*)").unwrap());

pub const NO_PHONE_NUMBERS: &str = "No phone numbers found.";

/// `Event Type:` lines, comma-split and re-joined with ", ".
pub fn extract_event_types(text: &str) -> String {
    EVENT_TYPE_RE
        .captures_iter(text)
        .flat_map(|c| split_list(c.get(1).map_or("", |m| m.as_str())))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `Entities:` lines with parenthesised acronyms removed.
pub fn extract_entities(text: &str) -> String {
    ENTITIES_RE
        .captures_iter(text)
        .flat_map(|c| split_list(c.get(1).map_or("", |m| m.as_str())))
        .map(|entity| PAREN_RE.replace_all(&entity, "").trim().to_string())
        .filter(|entity| !entity.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Person names share the `Entities:` label with organisations.
pub fn extract_names(text: &str) -> String {
    extract_entities(text)
}

/// The bracketed list after `Event Locations:`. A labelled line without
/// brackets yields the rest of that line; an unlabelled reply passes through
/// whole. The label itself never reaches the splitter.
pub fn extract_locations(text: &str) -> String {
    let captured = LOCATIONS_RE
        .captures(text)
        .or_else(|| LOCATIONS_LINE_RE.captures(text))
        .and_then(|c| c.get(1));
    match captured {
        Some(m) => m.as_str().trim().trim_matches(';').trim().to_string(),
        None => text.trim().to_string(),
    }
}

pub fn extract_phone_numbers(text: &str) -> String {
    PHONE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| NO_PHONE_NUMBERS.to_string())
}

fn split_list(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
