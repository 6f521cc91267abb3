//! Per-entry actions: delete from the backend, download an artifact.
//!
//! Both actions report to the shared notifier. Deletion also updates the
//! caller's list, but only after the backend has confirmed it.

use crate::api::ApiClient;
use crate::error::HistoryError;
use crate::history::HistoryList;
use crate::model::{artifact_url, EntryKey, Feature};
use crate::notify::{Notice, SharedNotifier};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DELETED: &str = "Item deleted successfully.";
const DELETE_FAILED: &str = "Error deleting item. Please try again later.";

/// Result of [`ItemActions::delete_entry`].
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The backend accepted the delete. `removed` is false when the entry
    /// was not in the local list.
    Deleted { removed: bool },
    /// The label is not one of the four features. Nothing was sent.
    UnknownFeature(String),
    /// The backend call failed; the list is unchanged.
    Failed(HistoryError),
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }
}

pub struct ItemActions {
    client: ApiClient,
    notifier: SharedNotifier,
}

impl ItemActions {
    pub fn new(client: ApiClient, notifier: SharedNotifier) -> Self {
        Self { client, notifier }
    }

    /// Delete record `id` of the feature labelled `feature_label`, then drop
    /// the matching entry from `list`.
    pub async fn delete_entry(
        &self,
        list: &mut HistoryList,
        id: &str,
        feature_label: &str,
    ) -> DeleteOutcome {
        let feature: Feature = match feature_label.parse() {
            Ok(f) => f,
            Err(_) => {
                warn!(
                    "Ignoring delete of '{}' for unknown feature '{}'",
                    id, feature_label
                );
                return DeleteOutcome::UnknownFeature(feature_label.to_string());
            }
        };

        match self.client.delete_record(feature, id).await {
            Ok(()) => {
                let removed = list.remove(&EntryKey::new(feature, id)).is_some();
                info!("Deleted {} entry {} (was listed: {})", feature, id, removed);
                self.notifier.notify(Notice::success(DELETED));
                DeleteOutcome::Deleted { removed }
            }
            Err(e) => {
                warn!("Delete of {} entry {} failed: {}", feature, id, e);
                self.notifier.notify(Notice::error(DELETE_FAILED));
                DeleteOutcome::Failed(e)
            }
        }
    }

    /// Fetch an artifact and save it into `dest_dir`, returning the written path.
    ///
    /// A missing URL (absent, empty, or the `Unknown` marker) is rejected
    /// before any request is made.
    pub async fn download_entry(
        &self,
        url: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, HistoryError> {
        let Some(url) = url.and_then(artifact_url) else {
            let err = HistoryError::MissingUrl;
            self.notifier.notify(Notice::error(err.to_string()));
            return Err(err);
        };

        let artifact = match self.client.fetch_artifact(url).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Download of {} failed: {}", url, e);
                self.notifier
                    .notify(Notice::error(format!("Download failed: {e}")));
                return Err(e);
            }
        };

        match save(dest_dir, &artifact.filename, &artifact.bytes).await {
            Ok(path) => {
                info!(
                    "Downloaded {} ({} bytes) to {}",
                    artifact.url,
                    artifact.bytes.len(),
                    path.display()
                );
                self.notifier
                    .notify(Notice::success(format!("Saved {}", path.display())));
                Ok(path)
            }
            Err(e) => {
                self.notifier.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Write through a hidden `.part` file so a partial download never has the
/// final name.
async fn save(dest_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, HistoryError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| write_failed(dest_dir, e))?;

    let target = dest_dir.join(filename);
    let partial = dest_dir.join(format!(".{filename}.part"));

    tokio::fs::write(&partial, bytes)
        .await
        .map_err(|e| write_failed(&partial, e))?;
    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(write_failed(&target, e));
    }
    Ok(target)
}

fn write_failed(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_final_name_only() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        let path = save(&dest, "table.xlsx", b"data").await.unwrap();
        assert_eq!(path, dest.join("table.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
        assert!(!dest.join(".table.xlsx.part").exists());
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"old").unwrap();

        tokio_test::block_on(save(dir.path(), "a.pdf", b"new")).unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.pdf")).unwrap(), b"new");
    }
}
