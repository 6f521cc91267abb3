//! Error types for the docproc-history library.
//!
//! Every fallible operation returns [`HistoryError`]. The aggregators and
//! item actions never let one escape as a panic: they catch it at the
//! component boundary, publish a [`crate::notify::Notice`], and hand the
//! error back to the caller as data (see [`crate::history::LoadOutcome`]).
//!
//! [`HistoryError::kind`] folds the variants into the small taxonomy callers
//! actually branch on: transport trouble, bad credentials, a response that
//! does not look like the backend's, or input rejected before any request.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docproc-history library.
#[derive(Debug, Error)]
pub enum HistoryError {
    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or the body could not be read.
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// The request did not complete within the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The request was aborted through the client's cancellation token.
    #[error("Request to '{url}' was cancelled")]
    Cancelled { url: String },

    /// The backend answered with a non-success status other than 401/403.
    #[error("HTTP {status} from '{url}'")]
    HttpStatus { url: String, status: u16 },

    // ── Authorization errors ──────────────────────────────────────────────
    /// No credential is stored in the session.
    #[error("Not signed in: no credential in the session.\nRun: docproc session set --token <TOKEN>")]
    MissingCredential,

    /// The backend rejected the credential (HTTP 401 or 403).
    #[error("Credential rejected by '{url}' (HTTP {status})")]
    Unauthorized { url: String, status: u16 },

    // ── Response shape errors ─────────────────────────────────────────────
    /// The body was not the JSON shape we expect (e.g. missing `next`).
    #[error("Unexpected response from '{url}': {detail}")]
    UnexpectedResponse { url: String, detail: String },

    // ── Validation errors ─────────────────────────────────────────────────
    /// A feature label outside the closed feature set.
    #[error("Unknown feature '{0}'")]
    UnknownFeature(String),

    /// An entry has no artifact URL to act on.
    #[error("File not available for download.")]
    MissingUrl,

    /// A record id that cannot be addressed as one path segment.
    #[error("Invalid record id '{0}'")]
    InvalidRecordId(String),

    /// A URL that cannot be parsed or joined onto the base URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Preview errors ────────────────────────────────────────────────────
    /// The fetched artifact does not start with the PDF magic bytes.
    #[error("Artifact at '{url}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: Vec<u8> },

    /// pdfium failed to open or rasterise the document.
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Local I/O errors ──────────────────────────────────────────────────
    /// Could not read or write the persisted session.
    #[error("Session file '{path}': {reason}")]
    Session { path: PathBuf, reason: String },

    /// Could not write a downloaded artifact.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`HistoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network failure, timeout, or an unexpected HTTP status.
    Transport,
    /// Missing, expired or rejected credential.
    Authorization,
    /// The backend answered with something we cannot interpret.
    UnexpectedResponse,
    /// Input rejected before reaching the network.
    Validation,
    /// The caller cancelled the request.
    Cancelled,
    /// Local I/O, rendering, or internal failure.
    Internal,
}

impl HistoryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::Transport { .. }
            | HistoryError::Timeout { .. }
            | HistoryError::HttpStatus { .. } => ErrorKind::Transport,
            HistoryError::Cancelled { .. } => ErrorKind::Cancelled,
            HistoryError::MissingCredential | HistoryError::Unauthorized { .. } => {
                ErrorKind::Authorization
            }
            HistoryError::UnexpectedResponse { .. } | HistoryError::NotAPdf { .. } => {
                ErrorKind::UnexpectedResponse
            }
            HistoryError::UnknownFeature(_)
            | HistoryError::MissingUrl
            | HistoryError::InvalidRecordId(_)
            | HistoryError::InvalidUrl { .. }
            | HistoryError::InvalidConfig(_) => ErrorKind::Validation,
            HistoryError::RenderFailed(_)
            | HistoryError::PdfiumBindingFailed(_)
            | HistoryError::Session { .. }
            | HistoryError::WriteFailed { .. }
            | HistoryError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// `true` when retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            HistoryError::Timeout { .. } | HistoryError::Transport { .. } => true,
            HistoryError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_authorization_kind() {
        let e = HistoryError::Unauthorized {
            url: "https://example.com/api/files/".into(),
            status: 401,
        };
        assert_eq!(e.kind(), ErrorKind::Authorization);
        assert!(e.to_string().contains("401"));
    }

    #[test]
    fn missing_credential_hints_at_session_command() {
        let msg = HistoryError::MissingCredential.to_string();
        assert!(msg.contains("session set"), "got: {msg}");
    }

    #[test]
    fn validation_errors_never_transient() {
        assert_eq!(HistoryError::MissingUrl.kind(), ErrorKind::Validation);
        assert!(!HistoryError::UnknownFeature("Reader".into()).is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let e = HistoryError::HttpStatus {
            url: "u".into(),
            status: 503,
        };
        assert!(e.is_transient());
        let e = HistoryError::HttpStatus {
            url: "u".into(),
            status: 404,
        };
        assert!(!e.is_transient());
    }

    #[test]
    fn timeout_display() {
        let e = HistoryError::Timeout {
            url: "https://example.com/api/images/".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert_eq!(e.kind(), ErrorKind::Transport);
    }
}
