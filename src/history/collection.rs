use super::{HistoryList, LoadOutcome, PaginationCursor, FETCH_FAILED, NO_MORE_HISTORY};
use crate::api::ApiClient;
use crate::model::{Feature, HistoryEntry};
use crate::notify::{Notice, SharedNotifier};
use tracing::{debug, info, warn};

/// Incrementally paged history of a single feature's collection.
///
/// Each [`load_more`](Self::load_more) fetches the page at the cursor and
/// appends it. Calls are serialized through `&mut self`, so the cursor is
/// only ever extended from its last known position.
pub struct CollectionHistory {
    client: ApiClient,
    notifier: SharedNotifier,
    feature: Feature,
    cursor: PaginationCursor,
    list: HistoryList,
}

impl CollectionHistory {
    pub fn new(client: ApiClient, notifier: SharedNotifier, feature: Feature) -> Self {
        Self {
            client,
            notifier,
            feature,
            cursor: PaginationCursor::start(feature),
            list: HistoryList::new(),
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn list(&self) -> &HistoryList {
        &self.list
    }

    /// Mutable access for item actions (deletion removes from this list).
    pub fn list_mut(&mut self) -> &mut HistoryList {
        &mut self.list
    }

    pub fn has_more(&self) -> bool {
        !self.cursor.is_exhausted()
    }

    /// Fetch the next page and merge it into the list.
    ///
    /// Never fails outright: an exhausted cursor yields
    /// [`LoadOutcome::Exhausted`] without touching the network, and a failed
    /// request leaves both cursor and list as they were.
    pub async fn load_more(&mut self) -> LoadOutcome {
        let Some(url) = self.cursor.url().map(str::to_string) else {
            debug!("{} history exhausted", self.feature);
            self.notifier.notify(Notice::info(NO_MORE_HISTORY));
            return LoadOutcome::Exhausted;
        };

        match self.client.fetch_page(&url).await {
            Ok(page) => {
                let feature = self.feature;
                let added = self.list.extend(
                    page.results
                        .into_iter()
                        .map(|r| HistoryEntry::from_record(r, feature)),
                );
                self.cursor.advance(page.next);
                info!(
                    "{} history: +{} entries ({} total, more: {})",
                    feature,
                    added,
                    self.list.len(),
                    self.has_more()
                );
                LoadOutcome::Loaded {
                    added,
                    has_more: self.has_more(),
                }
            }
            Err(e) => {
                warn!("Failed to load {} history from {}: {}", self.feature, url, e);
                self.notifier.notify(Notice::error(FETCH_FAILED));
                LoadOutcome::Failed(e)
            }
        }
    }
}
