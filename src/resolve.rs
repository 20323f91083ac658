//! Foreign-key resolution and the small field parsers shared by the
//! transforms.
//!
//! Resolution is strictly "map or null": an unresolved label becomes `None`
//! (NULL downstream), never the original text, so foreign-key columns stay
//! well-typed.

use chrono::NaiveDateTime;

use crate::dimension::Dimension;

/// Resolve a raw label against a dimension mapping.
pub fn resolve_label(dim: &Dimension, raw: &str) -> Option<u32> {
    dim.id(raw)
}

/// The three positional parts of a compound targeting-criteria value,
/// e.g. `"Age25-34, Sports, New York"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetingCriteria {
    pub age_start: Option<u32>,
    pub age_end: Option<u32>,
    pub interest: Option<String>,
    pub location: Option<String>,
}

/// Decompose a targeting-criteria value. A value that does not split into
/// exactly three comma-separated parts yields all-`None` derived fields;
/// this is a tolerated degenerate case, not an error.
pub fn parse_targeting(raw: &str) -> TargetingCriteria {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return TargetingCriteria::default();
    }
    let (age_start, age_end) = parse_age_range(parts[0]);
    TargetingCriteria {
        age_start,
        age_end,
        interest: non_empty(parts[1]),
        location: non_empty(parts[2]),
    }
}

// "Age25-34" -> (25, 34); anything malformed -> (None, None).
fn parse_age_range(part: &str) -> (Option<u32>, Option<u32>) {
    let trimmed = part.trim();
    let rest = trimmed.strip_prefix("Age").unwrap_or(trimmed);
    match rest.split_once('-') {
        Some((start, end)) => (start.trim().parse().ok(), end.trim().parse().ok()),
        None => (None, None),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse an ad slot size label like `"300x250"` into (width, height).
pub fn parse_slot_size(raw: &str) -> (Option<u32>, Option<u32>) {
    match raw.trim().split_once('x') {
        Some((w, h)) => (w.trim().parse().ok(), h.trim().parse().ok()),
        None => (None, None),
    }
}

/// Coerce truthy/falsy text ("True"/"False", "1"/"0", "yes"/"no") to a
/// boolean. `None` means the value is not a recognizable boolean at all.
pub fn parse_truthy(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

const CLICK_TS_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Lenient click-timestamp normalization: unparseable values become `None`
/// rather than aborting the run (most events have no click at all).
pub fn parse_click_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    CLICK_TS_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_map_or_null() {
        let dim = Dimension::from_first_seen(["Sports", "Music"]);
        assert_eq!(resolve_label(&dim, "Sports"), Some(1));
        assert_eq!(resolve_label(&dim, " Music "), Some(2));
        assert_eq!(resolve_label(&dim, "Knitting"), None);
    }

    #[test]
    fn decomposes_well_formed_targeting() {
        let t = parse_targeting("Age25-34, Sports, New York");
        assert_eq!(t.age_start, Some(25));
        assert_eq!(t.age_end, Some(34));
        assert_eq!(t.interest.as_deref(), Some("Sports"));
        assert_eq!(t.location.as_deref(), Some("New York"));
    }

    #[test]
    fn wrong_part_count_yields_all_none() {
        assert_eq!(parse_targeting("Age25-34, Sports"), TargetingCriteria::default());
        assert_eq!(
            parse_targeting("Age25-34, Sports, New York, Extra"),
            TargetingCriteria::default()
        );
        assert_eq!(parse_targeting(""), TargetingCriteria::default());
    }

    #[test]
    fn malformed_age_range_keeps_other_parts() {
        let t = parse_targeting("Adults, Sports, Boston");
        assert_eq!((t.age_start, t.age_end), (None, None));
        assert_eq!(t.interest.as_deref(), Some("Sports"));
        assert_eq!(t.location.as_deref(), Some("Boston"));
    }

    #[test]
    fn parses_slot_sizes() {
        assert_eq!(parse_slot_size("300x250"), (Some(300), Some(250)));
        assert_eq!(parse_slot_size(" 728 x 90 "), (Some(728), Some(90)));
        assert_eq!(parse_slot_size("fullscreen"), (None, None));
    }

    #[test]
    fn coerces_truthy_text() {
        assert_eq!(parse_truthy("True"), Some(true));
        assert_eq!(parse_truthy("false"), Some(false));
        assert_eq!(parse_truthy("1"), Some(true));
        assert_eq!(parse_truthy("0"), Some(false));
        assert_eq!(parse_truthy("maybe"), None);
        assert_eq!(parse_truthy(""), None);
    }

    #[test]
    fn click_timestamps_are_lenient() {
        assert!(parse_click_timestamp("2024-06-01 10:00:05").is_some());
        assert!(parse_click_timestamp("2024-06-01T10:00:05").is_some());
        assert_eq!(parse_click_timestamp("not a date"), None);
        assert_eq!(parse_click_timestamp(""), None);
    }
}
