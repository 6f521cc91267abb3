use super::{HistoryList, FETCH_FAILED};
use crate::api::ApiClient;
use crate::error::HistoryError;
use crate::model::{Feature, HistoryEntry};
use crate::notify::{Notice, SharedNotifier};
use futures::future::join_all;
use tracing::{info, warn};

/// Result of one collection inside a unified load.
#[derive(Debug)]
pub struct CollectionReport {
    pub feature: Feature,
    /// Number of entries fetched, or why the fetch failed.
    pub outcome: Result<usize, HistoryError>,
}

/// What a unified load did, per collection.
#[derive(Debug)]
pub struct UnifiedReport {
    pub collections: Vec<CollectionReport>,
    /// Entries in the list after the load.
    pub total: usize,
}

impl UnifiedReport {
    pub fn failures(&self) -> impl Iterator<Item = (Feature, &HistoryError)> {
        self.collections
            .iter()
            .filter_map(|c| c.outcome.as_ref().err().map(|e| (c.feature, e)))
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// First page of every feature's collection, merged into one list.
///
/// The four requests run concurrently. The merged order is fixed by
/// [`Feature::ALL`], never by which response arrives first, and each entry is
/// tagged by the request that fetched it.
pub struct UnifiedHistory {
    client: ApiClient,
    notifier: SharedNotifier,
    list: HistoryList,
}

impl UnifiedHistory {
    pub fn new(client: ApiClient, notifier: SharedNotifier) -> Self {
        Self {
            client,
            notifier,
            list: HistoryList::new(),
        }
    }

    pub fn list(&self) -> &HistoryList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut HistoryList {
        &mut self.list
    }

    /// Reload the first page of all collections and replace the list.
    ///
    /// A collection that fails keeps the entries it contributed to the
    /// previous list; the others are replaced. At most one error notice is
    /// published per call.
    pub async fn load(&mut self) -> UnifiedReport {
        let fetches = Feature::ALL.into_iter().map(|feature| {
            let client = self.client.clone();
            async move { (feature, client.fetch_page(feature.collection()).await) }
        });
        let pages = join_all(fetches).await;

        let mut merged = HistoryList::new();
        let mut collections = Vec::with_capacity(pages.len());

        for (feature, result) in pages {
            match result {
                Ok(page) => {
                    let fetched = page.results.len();
                    merged.extend(
                        page.results
                            .into_iter()
                            .map(|r| HistoryEntry::from_record(r, feature)),
                    );
                    collections.push(CollectionReport {
                        feature,
                        outcome: Ok(fetched),
                    });
                }
                Err(e) => {
                    warn!("Failed to load {} history: {}", feature, e);
                    merged.extend(self.list.for_feature(feature).cloned());
                    collections.push(CollectionReport {
                        feature,
                        outcome: Err(e),
                    });
                }
            }
        }

        self.list = merged;
        let report = UnifiedReport {
            collections,
            total: self.list.len(),
        };

        if report.is_complete() {
            info!("Unified history loaded: {} entries", report.total);
        } else {
            self.notifier.notify(Notice::error(FETCH_FAILED));
        }
        report
    }
}
