//! History aggregation.
//!
//! Two views over the backend's per-feature collections:
//!
//! * [`CollectionHistory`] pages through one collection with "load more"
//!   semantics, following the backend's `next` cursor until it runs out.
//! * [`UnifiedHistory`] fetches the first page of all four collections
//!   concurrently and merges them into one list tagged by origin.
//!
//! Both keep their entries in a [`HistoryList`], unique by
//! [`crate::model::EntryKey`] and ordered by first appearance.

mod collection;
mod cursor;
mod list;
mod unified;

pub use collection::CollectionHistory;
pub use cursor::PaginationCursor;
pub use list::HistoryList;
pub use unified::{CollectionReport, UnifiedHistory, UnifiedReport};

use crate::error::HistoryError;

pub(crate) const NO_MORE_HISTORY: &str = "No More History";
pub(crate) const FETCH_FAILED: &str = "Error fetching history data. Please try again later.";

/// Result of [`CollectionHistory::load_more`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// A page was fetched; `added` counts entries not already in the list.
    Loaded { added: usize, has_more: bool },
    /// The cursor was already exhausted; nothing was requested.
    Exhausted,
    /// The request failed; the list and cursor are unchanged.
    Failed(HistoryError),
}

impl LoadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed(_))
    }
}
