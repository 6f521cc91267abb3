//! Thumbnails for history entries.
//!
//! An artifact URL is classified by its path extension:
//!
//! | Extension                         | Preview                                   |
//! |-----------------------------------|-------------------------------------------|
//! | `jpg` `jpeg` `png` `gif` `webp`   | the URL itself, no request made           |
//! | `pdf`                             | page 1 rendered to a PNG data URL         |
//! | anything else                     | none; front-ends show a generic file icon |
//!
//! PDF results are cached per URL, failures included, and concurrent
//! requests for the same URL share one fetch. There is no retry: a PDF that
//! failed once stays without a preview until it is evicted. The per-URL
//! cache grows with every distinct PDF seen; drop a deleted entry's slots
//! with [`PreviewRenderer::evict_entry`].

pub mod encode;
pub mod render;
mod stream;

pub use render::{PdfiumRasterizer, Rasterizer};
pub use stream::PreviewStream;

use crate::api::ApiClient;
use crate::error::HistoryError;
use crate::model::{artifact_url, EntryKey, HistoryEntry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png|gif|webp)$").expect("valid regex"));

static PDF_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").expect("valid regex"));

/// How an artifact URL is previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Pdf,
    Other,
}

/// Classify `url` by the extension of its path; query and fragment are ignored.
pub fn classify(url: &str) -> ArtifactKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if IMAGE_EXT.is_match(path) {
        ArtifactKind::Image
    } else if PDF_EXT.is_match(path) {
        ArtifactKind::Pdf
    } else {
        ArtifactKind::Other
    }
}

/// A displayable thumbnail source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preview {
    /// An image artifact used as its own thumbnail.
    Direct { url: String },
    /// Page 1 of a PDF as `data:image/png;base64,...`.
    Rendered {
        data_url: String,
        width: u32,
        height: u32,
    },
}

impl Preview {
    /// Value for an `<img src>`-style consumer.
    pub fn src(&self) -> &str {
        match self {
            Preview::Direct { url } => url,
            Preview::Rendered { data_url, .. } => data_url,
        }
    }
}

/// Previews for both artifacts of one entry. `None` means "show the icon".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewPair {
    pub input: Option<Preview>,
    pub output: Option<Preview>,
}

/// Previews keyed by entry identity.
#[derive(Debug, Default)]
pub struct PreviewCache {
    pairs: HashMap<EntryKey, PreviewPair>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EntryKey, pair: PreviewPair) {
        self.pairs.insert(key, pair);
    }

    pub fn get(&self, key: &EntryKey) -> Option<&PreviewPair> {
        self.pairs.get(key)
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.pairs.contains_key(key)
    }

    /// Drop the previews of a deleted entry.
    pub fn remove(&mut self, key: &EntryKey) -> Option<PreviewPair> {
        self.pairs.remove(key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

type Slot = Arc<OnceCell<Option<Preview>>>;

/// Resolves artifact URLs to previews, rendering PDFs on demand.
pub struct PreviewRenderer {
    client: ApiClient,
    rasterizer: Arc<dyn Rasterizer>,
    resolved: Mutex<HashMap<String, Slot>>,
}

impl PreviewRenderer {
    /// Renderer using pdfium, bound from the client configuration.
    pub fn new(client: ApiClient) -> Self {
        let rasterizer = PdfiumRasterizer::new(client.config().pdfium_library.clone());
        Self::with_rasterizer(client, Arc::new(rasterizer))
    }

    pub fn with_rasterizer(client: ApiClient, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            client,
            rasterizer,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Preview for one artifact URL, or `None` when the caller should fall
    /// back to a generic icon.
    pub async fn resolve_preview(&self, url: &str) -> Option<Preview> {
        let url = artifact_url(url)?;
        match classify(url) {
            ArtifactKind::Image => Some(Preview::Direct {
                url: url.to_string(),
            }),
            ArtifactKind::Other => None,
            ArtifactKind::Pdf => {
                let slot = {
                    let mut resolved = self.resolved.lock().await;
                    Arc::clone(resolved.entry(url.to_string()).or_default())
                };
                slot.get_or_init(|| async {
                    match self.render_pdf(url).await {
                        Ok(preview) => Some(preview),
                        Err(e) => {
                            warn!("No preview for {}: {}", url, e);
                            None
                        }
                    }
                })
                .await
                .clone()
            }
        }
    }

    /// Resolve the input and output previews of `entry` concurrently.
    ///
    /// A server-rendered thumbnail stands in for the input preview and is
    /// linked directly, resolved against the base URL.
    pub async fn resolve_entry(&self, entry: &HistoryEntry) -> PreviewPair {
        let (input, output) = futures::join!(
            async {
                match self.thumbnail(entry) {
                    Some(preview) => Some(preview),
                    None => self.resolve_preview(&entry.input).await,
                }
            },
            self.resolve_preview(&entry.output)
        );
        PreviewPair { input, output }
    }

    /// Forget the cached PDF results for both artifacts of `entry`.
    ///
    /// Returns how many slots were dropped. Calls already waiting on a slot
    /// still receive its result.
    pub async fn evict_entry(&self, entry: &HistoryEntry) -> usize {
        let mut resolved = self.resolved.lock().await;
        [entry.input_url(), entry.output_url()]
            .into_iter()
            .flatten()
            .filter(|url| resolved.remove(*url).is_some())
            .count()
    }

    /// Number of PDF URLs with a cached result.
    pub async fn cached_pdfs(&self) -> usize {
        self.resolved.lock().await.len()
    }

    fn thumbnail(&self, entry: &HistoryEntry) -> Option<Preview> {
        let raw = entry.thumbnail.as_deref()?;
        match self.client.config().resolve(raw) {
            Ok(url) => Some(Preview::Direct {
                url: url.to_string(),
            }),
            Err(e) => {
                warn!("Ignoring thumbnail of {}: {}", entry.key(), e);
                None
            }
        }
    }

    async fn render_pdf(&self, url: &str) -> Result<Preview, HistoryError> {
        let artifact = self.client.fetch_artifact(url).await?;
        if !artifact.bytes.starts_with(b"%PDF") {
            return Err(HistoryError::NotAPdf {
                url: artifact.url.to_string(),
                magic: artifact.bytes.iter().take(4).copied().collect(),
            });
        }

        let config = self.client.config();
        let (scale, max_pixels) = (config.preview_scale, config.max_preview_pixels);
        let rasterizer = Arc::clone(&self.rasterizer);
        let bytes = artifact.bytes;

        let image = tokio::task::spawn_blocking(move || {
            rasterizer.first_page(&bytes, scale, max_pixels)
        })
        .await
        .map_err(|e| HistoryError::Internal(format!("Render task panicked: {}", e)))??;

        debug!(
            "Preview for {}: {}x{} px",
            url,
            image.width(),
            image.height()
        );
        Ok(Preview::Rendered {
            data_url: encode::to_data_url(&image)?,
            width: image.width(),
            height: image.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;

    #[test]
    fn classification_by_extension() {
        assert_eq!(classify("https://x/a.PNG"), ArtifactKind::Image);
        assert_eq!(classify("/media/photo.jpeg"), ArtifactKind::Image);
        assert_eq!(classify("/media/scan.webp"), ArtifactKind::Image);
        assert_eq!(classify("https://x/doc.pdf"), ArtifactKind::Pdf);
        assert_eq!(classify("https://x/doc.pdf?sig=abc#p1"), ArtifactKind::Pdf);
        assert_eq!(classify("https://x/out.docx"), ArtifactKind::Other);
        assert_eq!(classify("https://x/pdf"), ArtifactKind::Other);
        assert_eq!(classify("Unknown"), ArtifactKind::Other);
    }

    #[test]
    fn cache_is_keyed_by_feature_and_id() {
        use crate::model::Feature;

        let mut cache = PreviewCache::new();
        cache.insert(EntryKey::new(Feature::PdfConversion, "1"), PreviewPair::default());
        assert!(!cache.contains(&EntryKey::new(Feature::ImageConversion, "1")));
        assert!(cache.remove(&EntryKey::new(Feature::PdfConversion, "1")).is_some());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn image_and_unknown_urls_need_no_network() {
        // Anonymous session: any request would fail, so a result proves none was made.
        let client = ApiClient::new(ClientConfig::default(), Arc::new(Session::anonymous())).unwrap();
        let renderer = PreviewRenderer::new(client);

        assert_eq!(
            renderer.resolve_preview("/media/a.png").await,
            Some(Preview::Direct {
                url: "/media/a.png".into()
            })
        );
        assert_eq!(renderer.resolve_preview("Unknown").await, None);
        assert_eq!(renderer.resolve_preview("/media/a.xlsx").await, None);
    }
}
