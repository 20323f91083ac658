//! Surrogate-keyed lookup tables derived from raw column values.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;

/// A dimension table: each distinct normalized label gets a dense, 1-based
/// surrogate integer ID, plus the label -> ID mapping used for foreign-key
/// resolution.
#[derive(Debug, Clone, Default)]
pub struct Dimension {
    labels: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Dimension {
    /// Build from a column of raw values, assigning IDs in first-occurrence
    /// order. Values are trimmed; empty values are dropped.
    pub fn from_first_seen<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_labels(
            values
                .into_iter()
                .map(|v| v.as_ref().trim().to_string())
                .filter(|v| !v.is_empty())
                .unique(),
        )
    }

    /// Build from a multi-valued column (e.g. comma-delimited interests):
    /// each raw value is split on `delimiter` before trimming and dedup.
    pub fn from_multi_valued<I, S>(values: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_labels(
            values
                .into_iter()
                .flat_map(|v| {
                    v.as_ref()
                        .split(delimiter)
                        .map(|part| part.trim().to_string())
                        .collect::<Vec<_>>()
                })
                .filter(|v| !v.is_empty())
                .unique(),
        )
    }

    /// Build from a globally collected value set, assigning IDs in
    /// lexicographic order so the result is independent of chunk arrival
    /// order.
    pub fn from_sorted(values: BTreeSet<String>) -> Self {
        Self::from_labels(values.into_iter().filter(|v| !v.is_empty()))
    }

    fn from_labels<I: Iterator<Item = String>>(labels: I) -> Self {
        let labels: Vec<String> = labels.collect();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), (i + 1) as u32))
            .collect();
        Self { labels, ids }
    }

    /// "Map or null": the surrogate ID for a raw label, or `None` when the
    /// label never appeared in the source column.
    pub fn id(&self, label: &str) -> Option<u32> {
        self.ids.get(label.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(id, label)` pairs in ID order, IDs starting at 1.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| ((i + 1) as u32, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_one_based_first_seen() {
        let dim = Dimension::from_first_seen(["Male", "Female", "Male", "Other"]);
        assert_eq!(dim.len(), 3);
        let pairs: Vec<(u32, &str)> = dim.iter().collect();
        assert_eq!(pairs, vec![(1, "Male"), (2, "Female"), (3, "Other")]);
        assert_eq!(dim.id("Female"), Some(2));
    }

    #[test]
    fn trims_and_drops_empty_values() {
        let dim = Dimension::from_first_seen(["  New York ", "", "New York", "   "]);
        assert_eq!(dim.len(), 1);
        assert_eq!(dim.id("New York"), Some(1));
        assert_eq!(dim.id("  New York  "), Some(1));
    }

    #[test]
    fn multi_valued_splits_before_dedup() {
        let dim =
            Dimension::from_multi_valued(["Sports, Music", "Music,Travel", " Sports"], ',');
        let pairs: Vec<(u32, &str)> = dim.iter().collect();
        assert_eq!(pairs, vec![(1, "Sports"), (2, "Music"), (3, "Travel")]);
    }

    #[test]
    fn sorted_set_assignment_is_lexicographic() {
        let set: BTreeSet<String> = ["Tablet", "Desktop", "Mobile"]
            .into_iter()
            .map(String::from)
            .collect();
        let dim = Dimension::from_sorted(set);
        let pairs: Vec<(u32, &str)> = dim.iter().collect();
        assert_eq!(pairs, vec![(1, "Desktop"), (2, "Mobile"), (3, "Tablet")]);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let dim = Dimension::from_first_seen(Vec::<String>::new());
        assert!(dim.is_empty());
        assert_eq!(dim.id("anything"), None);
    }

    #[test]
    fn unmapped_label_resolves_to_none() {
        let dim = Dimension::from_first_seen(["Mobile"]);
        assert_eq!(dim.id("Smart TV"), None);
    }
}
