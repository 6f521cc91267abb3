//! Resolve previews for many entries, yielding each as it completes.
//!
//! Entries are resolved `preview_concurrency` at a time and emitted in
//! completion order, so a slow PDF does not hold back the thumbnails behind
//! it. Use the key to place each result.

use super::{PreviewCache, PreviewPair, PreviewRenderer};
use crate::model::{EntryKey, HistoryEntry};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of resolved previews.
pub type PreviewStream<'a> = Pin<Box<dyn Stream<Item = (EntryKey, PreviewPair)> + Send + 'a>>;

impl PreviewRenderer {
    pub fn preview_stream<'a>(&'a self, entries: &'a [HistoryEntry]) -> PreviewStream<'a> {
        let concurrency = self.client.config().preview_concurrency;
        let s = stream::iter(entries)
            .map(move |entry| async move { (entry.key(), self.resolve_entry(entry).await) })
            .buffer_unordered(concurrency);
        Box::pin(s)
    }

    /// Resolve every entry not yet in `cache` and store the results.
    ///
    /// Returns how many entries were added.
    pub async fn populate(&self, entries: &[HistoryEntry], cache: &mut PreviewCache) -> usize {
        let pending: Vec<HistoryEntry> = entries
            .iter()
            .filter(|e| !cache.contains(&e.key()))
            .cloned()
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let mut added = 0;
        let mut stream = self.preview_stream(&pending);
        while let Some((key, pair)) = stream.next().await {
            cache.insert(key, pair);
            added += 1;
        }
        info!("Resolved previews for {} entries", added);
        added
    }
}
