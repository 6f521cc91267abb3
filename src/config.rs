//! Client configuration.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via
//! [`ClientConfigBuilder`]. The builder clamps numeric knobs into their valid
//! ranges and `build()` rejects what cannot be clamped (a malformed base URL).

use crate::error::HistoryError;
use reqwest::Url;
use std::path::PathBuf;

/// Backend origin used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://ocr.goodwish.com.np/";

/// Configuration shared by the API client, aggregators and preview renderer.
///
/// # Example
/// ```rust
/// use docproc_history::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://backend.example.com")
///     .request_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url.as_str(), "https://backend.example.com/");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin. Always ends with `/` so collection paths join onto it.
    pub base_url: Url,

    /// Timeout for list and delete requests in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Timeout for artifact downloads (including preview fetches). Default: 120.
    pub download_timeout_secs: u64,

    /// Scale factor applied to page 1 when rendering a PDF preview. Default: 1.5.
    pub preview_scale: f32,

    /// Longest edge of a rendered preview, in pixels. Default: 1024.
    ///
    /// Applied after `preview_scale`, so a poster-sized first page cannot
    /// allocate an unbounded bitmap.
    pub max_preview_pixels: u32,

    /// How many previews are resolved at once. Default: 4.
    pub preview_concurrency: usize,

    /// Explicit pdfium library path. If None, `PDFIUM_LIB_PATH` is consulted,
    /// then the system library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: 30,
            download_timeout_secs: 120,
            preview_scale: 1.5,
            max_preview_pixels: 1024,
            preview_concurrency: 4,
            pdfium_library: None,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
            base_url: None,
        }
    }

    /// Resolve `path` against the base URL.
    ///
    /// Absolute `http(s)` URLs pass through unchanged; anything else
    /// (`api/images/`, `/media/x.png`) is joined onto the base.
    pub fn resolve(&self, path: &str) -> Result<Url, HistoryError> {
        let joined = if is_absolute(path) {
            Url::parse(path)
        } else {
            self.base_url.join(path)
        };
        joined.map_err(|e| HistoryError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// `true` when `url` has the same scheme, host and port as the base URL.
    ///
    /// The session credential is only ever sent to this origin.
    pub fn is_backend(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
    base_url: Option<String>,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn preview_scale(mut self, scale: f32) -> Self {
        self.config.preview_scale = scale.clamp(0.1, 4.0);
        self
    }

    pub fn max_preview_pixels(mut self, px: u32) -> Self {
        self.config.max_preview_pixels = px.max(64);
        self
    }

    pub fn preview_concurrency(mut self, n: usize) -> Self {
        self.config.preview_concurrency = n.max(1);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating the base URL.
    pub fn build(mut self) -> Result<ClientConfig, HistoryError> {
        if let Some(raw) = self.base_url.take() {
            self.config.base_url = parse_base_url(&raw)?;
        }
        Ok(self.config)
    }
}

/// Check if the string already carries an http(s) scheme.
pub fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parse a backend origin, requiring http(s) and forcing a trailing slash.
fn parse_base_url(raw: &str) -> Result<Url, HistoryError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| HistoryError::InvalidConfig(format!("base URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HistoryError::InvalidConfig(format!(
            "base URL must be http or https, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(c.request_timeout_secs, 30);
        assert_eq!(c.preview_scale, 1.5);
        assert_eq!(c.preview_concurrency, 4);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let c = ClientConfig::builder()
            .base_url("http://127.0.0.1:8000")
            .build()
            .unwrap();
        assert_eq!(c.base_url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidConfig(_)));
    }

    #[test]
    fn clamps_knobs() {
        let c = ClientConfig::builder()
            .request_timeout_secs(0)
            .preview_scale(50.0)
            .preview_concurrency(0)
            .max_preview_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.request_timeout_secs, 1);
        assert_eq!(c.preview_scale, 4.0);
        assert_eq!(c.preview_concurrency, 1);
        assert_eq!(c.max_preview_pixels, 64);
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("https://example.com/doc.pdf"));
        assert!(is_absolute("http://example.com/doc.pdf"));
        assert!(!is_absolute("/media/doc.pdf"));
        assert!(!is_absolute("doc.pdf"));
        assert!(!is_absolute(""));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let c = ClientConfig::builder()
            .base_url("https://backend.example.com/")
            .build()
            .unwrap();
        assert_eq!(
            c.resolve("api/images/").unwrap().as_str(),
            "https://backend.example.com/api/images/"
        );
        assert_eq!(
            c.resolve("/media/page1.png").unwrap().as_str(),
            "https://backend.example.com/media/page1.png"
        );
        assert_eq!(
            c.resolve("https://cdn.example.com/a.pdf").unwrap().as_str(),
            "https://cdn.example.com/a.pdf"
        );
    }

    #[test]
    fn backend_origin_check() {
        let c = ClientConfig::builder()
            .base_url("https://backend.example.com/")
            .build()
            .unwrap();
        assert!(c.is_backend(&c.resolve("/media/a.pdf").unwrap()));
        assert!(!c.is_backend(&c.resolve("https://cdn.example.com/a.pdf").unwrap()));
        assert!(!c.is_backend(&c.resolve("http://backend.example.com/a.pdf").unwrap()));
        assert!(!c.is_backend(&c.resolve("https://backend.example.com:8443/a.pdf").unwrap()));
    }
}
