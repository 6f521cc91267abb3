//! # docproc-history
//!
//! Browse, preview, delete and download the history of a document-processing
//! backend (PDF conversion, table extraction, document analysis, image
//! conversion).
//!
//! The backend keeps one paginated collection per feature. Record ids are
//! only unique inside a collection, so this crate identifies entries by the
//! composite key `(feature, id)` everywhere it needs uniqueness.
//!
//! ## Components
//!
//! ```text
//! Session ──► ApiClient ──┬─► CollectionHistory   one feature, "load more" paging
//!                         ├─► UnifiedHistory      first page of all four, merged
//!                         ├─► PreviewRenderer     image URL / PDF page 1 → thumbnail
//!                         └─► ItemActions         delete, download
//!
//!          every component ──► Notifier (NotificationHub: broadcast pub/sub)
//! ```
//!
//! Failures never escape as panics. Each component catches them at its
//! boundary, publishes a [`Notice`], and returns the error as data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docproc_history::{ApiClient, ClientConfig, NotificationHub, SessionStore, UnifiedHistory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionStore::default_location().load()?;
//!     let client = ApiClient::new(ClientConfig::default(), Arc::new(session))?;
//!     let hub = Arc::new(NotificationHub::new());
//!
//!     let mut history = UnifiedHistory::new(client, hub);
//!     let report = history.load().await;
//!     for entry in history.list() {
//!         println!("{:<18} {} {}", entry.feature, entry.date, entry.output);
//!     }
//!     eprintln!("{} entries, complete: {}", report.total, report.is_complete());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docproc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docproc-history = { version = "0.3", default-features = false }
//! ```
//!
//! PDF previews need a pdfium shared library at runtime. It is looked up via
//! [`ClientConfig::pdfium_library`], then `PDFIUM_LIB_PATH`, then the system
//! library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod notify;
pub mod preview;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use actions::{DeleteOutcome, ItemActions};
pub use api::{ApiClient, Artifact};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{ErrorKind, HistoryError};
pub use history::{
    CollectionHistory, CollectionReport, HistoryList, LoadOutcome, PaginationCursor,
    UnifiedHistory, UnifiedReport,
};
pub use model::{EntryKey, Feature, HistoryEntry, Page, RawPage, RawRecord, UNKNOWN};
pub use notify::{Notice, NoticeLevel, NoopNotifier, NotificationHub, Notifier, SharedNotifier};
pub use preview::{
    classify, ArtifactKind, PdfiumRasterizer, Preview, PreviewCache, PreviewPair,
    PreviewRenderer, PreviewStream, Rasterizer,
};
pub use session::{Session, SessionStore};
