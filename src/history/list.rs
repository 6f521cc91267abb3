//! Ordered, composite-key-unique list of history entries.

use crate::model::{EntryKey, Feature, HistoryEntry};
use std::collections::HashSet;

/// Entries in first-seen order, unique by [`EntryKey`].
///
/// The key set mirrors `entries` exactly; every mutation goes through
/// methods that keep the two in step.
#[derive(Debug, Clone, Default)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
    keys: HashSet<EntryKey>,
}

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `entries`, dropping later duplicates.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut list = Self::new();
        list.extend(entries);
        list
    }

    /// Append one entry unless its key is already present.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if self.keys.insert(entry.key()) {
            self.entries.push(entry);
            true
        } else {
            false
        }
    }

    /// Append entries in order, skipping keys already seen. Returns how many were added.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = HistoryEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.push(entry) {
                added += 1;
            }
        }
        added
    }

    /// Remove the entry with exactly this key.
    pub fn remove(&mut self, key: &EntryKey) -> Option<HistoryEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.feature == key.feature && e.id == key.id);
        self.keys.remove(key);
        pos.map(|pos| self.entries.remove(pos))
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.keys.contains(key)
    }

    pub fn get(&self, key: &EntryKey) -> Option<&HistoryEntry> {
        if !self.contains(key) {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.feature == key.feature && e.id == key.id)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    /// Entries produced by one feature's collection, in list order.
    pub fn for_feature(&self, feature: Feature) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.feature == feature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a HistoryList {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(feature: Feature, id: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            input: format!("/media/{id}.pdf"),
            output: format!("/media/{id}.docx"),
            date: "2024-01-01 00:00".into(),
            feature,
            thumbnail: None,
        }
    }

    #[test]
    fn keeps_first_seen_order_and_drops_duplicates() {
        let mut list = HistoryList::from_entries([
            entry(Feature::PdfConversion, "1"),
            entry(Feature::PdfConversion, "2"),
            entry(Feature::PdfConversion, "1"),
        ]);
        assert_eq!(list.len(), 2);

        let added = list.extend([
            entry(Feature::PdfConversion, "2"),
            entry(Feature::PdfConversion, "3"),
        ]);
        assert_eq!(added, 1);

        let ids: Vec<&str> = list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn same_id_across_features_is_kept() {
        let list = HistoryList::from_entries([
            entry(Feature::PdfConversion, "7"),
            entry(Feature::ImageConversion, "7"),
        ]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_is_by_composite_key() {
        let mut list = HistoryList::from_entries([
            entry(Feature::PdfConversion, "7"),
            entry(Feature::TableExtraction, "7"),
            entry(Feature::TableExtraction, "8"),
        ]);

        let removed = list.remove(&EntryKey::new(Feature::TableExtraction, "7"));
        assert_eq!(removed.map(|e| e.feature), Some(Feature::TableExtraction));
        assert_eq!(list.len(), 2);
        assert!(list.contains(&EntryKey::new(Feature::PdfConversion, "7")));
        assert!(list.remove(&EntryKey::new(Feature::TableExtraction, "7")).is_none());

        // A removed key may come back on a later load.
        assert!(list.push(entry(Feature::TableExtraction, "7")));
    }

    #[test]
    fn remove_clears_entry_and_key_even_when_out_of_step() {
        let mut list = HistoryList::from_entries([entry(Feature::PdfConversion, "1")]);
        // Entry present without its key.
        list.entries.push(entry(Feature::ImageConversion, "2"));
        // Key present without its entry.
        list.keys.insert(EntryKey::new(Feature::TableExtraction, "3"));

        let removed = list.remove(&EntryKey::new(Feature::ImageConversion, "2"));
        assert_eq!(removed.map(|e| e.id), Some("2".to_string()));
        assert!(list.remove(&EntryKey::new(Feature::TableExtraction, "3")).is_none());
        assert!(!list.contains(&EntryKey::new(Feature::TableExtraction, "3")));

        assert_eq!(list.len(), 1);
        assert_eq!(list.keys.len(), 1);
    }

    #[test]
    fn for_feature_filters() {
        let list = HistoryList::from_entries([
            entry(Feature::PdfConversion, "1"),
            entry(Feature::ImageConversion, "2"),
            entry(Feature::PdfConversion, "3"),
        ]);
        let ids: Vec<&str> = list
            .for_feature(Feature::PdfConversion)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "3"]);
        assert!(list.get(&EntryKey::new(Feature::ImageConversion, "2")).is_some());
    }
}
