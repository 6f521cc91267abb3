//! Authenticated access to the document-processing backend.
//!
//! [`ApiClient`] is the only place that talks HTTP. It attaches the session
//! credential (`Authorization: Token <credential>`) to every request, maps
//! status codes onto [`HistoryError`], and bounds every call two ways:
//!
//! * a per-request deadline (`request_timeout_secs` for list/delete,
//!   `download_timeout_secs` for artifact fetches), and
//! * a [`CancellationToken`] owned by the client. [`ApiClient::cancel_all`]
//!   aborts everything in flight and every request issued afterwards.
//!
//! A request that never settles therefore always ends as `Timeout` or
//! `Cancelled` instead of leaving its view in a perpetual loading state.

pub mod filename;

use crate::config::ClientConfig;
use crate::error::HistoryError;
use crate::model::{Feature, Page, RawRecord};
use crate::session::Session;
use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Response, StatusCode, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A fetched artifact held in memory.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Absolute URL the artifact was fetched from.
    pub url: Url,
    /// Filename from `Content-Disposition`, else the last URL segment.
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// HTTP client bound to one backend origin and one session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    session: Arc<Session>,
    cancel: CancellationToken,
}

impl ApiClient {
    /// Build a client. Fails only if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self, HistoryError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("docproc-history/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HistoryError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            session,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Abort every in-flight request, and every later one, with `Cancelled`.
    pub fn cancel_all(&self) {
        info!("Cancelling all backend requests");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Absolute URL of a feature's first page.
    pub fn collection_url(&self, feature: Feature) -> Result<Url, HistoryError> {
        self.config.resolve(feature.collection())
    }

    /// GET one page of a collection.
    ///
    /// `url` may be absolute (a `next` cursor) or relative to the base URL.
    pub async fn fetch_page(&self, url: &str) -> Result<Page<RawRecord>, HistoryError> {
        let url = self.config.resolve(url)?;
        let auth = self.session.authorization()?;
        debug!("GET {}", url);

        self.guarded(&url, self.config.request_timeout_secs, async {
            let response = self
                .http
                .get(url.clone())
                .header(AUTHORIZATION, &auth)
                .send()
                .await
                .map_err(|e| transport(&url, e, self.config.request_timeout_secs))?;
            let response = check_status(&url, response)?;
            let body = response
                .bytes()
                .await
                .map_err(|e| transport(&url, e, self.config.request_timeout_secs))?;

            serde_json::from_slice::<Page<RawRecord>>(&body).map_err(|e| {
                HistoryError::UnexpectedResponse {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            })
        })
        .await
    }

    /// Absolute URL of one record: `<collection><id>/`.
    ///
    /// The id is appended as a single percent-encoded segment, so it can never
    /// address a record outside `feature`'s collection.
    pub fn record_url(&self, feature: Feature, id: &str) -> Result<Url, HistoryError> {
        if !is_plain_segment(id) {
            return Err(HistoryError::InvalidRecordId(id.to_string()));
        }
        let mut url = self.collection_url(feature)?;
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| HistoryError::InvalidUrl {
                url: base,
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(id)
            .push("");
        Ok(url)
    }

    /// DELETE one record from its feature's collection.
    pub async fn delete_record(&self, feature: Feature, id: &str) -> Result<(), HistoryError> {
        let url = self.record_url(feature, id)?;
        let auth = self.session.authorization()?;
        debug!("DELETE {}", url);

        self.guarded(&url, self.config.request_timeout_secs, async {
            let response = self
                .http
                .delete(url.clone())
                .header(AUTHORIZATION, &auth)
                .send()
                .await
                .map_err(|e| transport(&url, e, self.config.request_timeout_secs))?;
            check_status(&url, response).map(|_| ())
        })
        .await
    }

    /// GET an artifact as raw bytes.
    ///
    /// The credential is attached only when `url` is on the backend's origin;
    /// artifacts hosted elsewhere are fetched anonymously.
    pub async fn fetch_artifact(&self, url: &str) -> Result<Artifact, HistoryError> {
        let url = self.config.resolve(url)?;
        let auth = if self.config.is_backend(&url) {
            Some(self.session.authorization()?)
        } else {
            None
        };
        let secs = self.config.download_timeout_secs;
        debug!("GET artifact {}", url);

        self.guarded(&url, secs, async {
            let mut request = self.http.get(url.clone());
            if let Some(auth) = &auth {
                request = request.header(AUTHORIZATION, auth);
            }
            let response = request
                .send()
                .await
                .map_err(|e| transport(&url, e, secs))?;
            let response = check_status(&url, response)?;

            let header = |name: HeaderName| {
                response
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let content_type = header(CONTENT_TYPE);
            let filename = header(CONTENT_DISPOSITION)
                .as_deref()
                .and_then(filename::from_content_disposition)
                .or_else(|| filename::from_url(&url))
                .unwrap_or_else(|| filename::FALLBACK.to_string());

            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport(&url, e, secs))?
                .to_vec();

            Ok(Artifact {
                url: url.clone(),
                filename,
                content_type,
                bytes,
            })
        })
        .await
    }

    /// Run `fut` under the client's cancellation token and a deadline.
    async fn guarded<T, F>(&self, url: &Url, secs: u64, fut: F) -> Result<T, HistoryError>
    where
        F: Future<Output = Result<T, HistoryError>>,
    {
        let token = self.cancel.child_token();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(HistoryError::Cancelled { url: url.to_string() }),
            outcome = tokio::time::timeout(Duration::from_secs(secs), fut) => {
                outcome.unwrap_or_else(|_| Err(HistoryError::Timeout { url: url.to_string(), secs }))
            }
        }
    }
}

/// Non-empty, not `.` or `..`, and free of separators or escapes.
fn is_plain_segment(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().all(|c| c == '.')
        && !id.contains(['/', '\\', '?', '#', '%'])
}

fn transport(url: &Url, e: reqwest::Error, secs: u64) -> HistoryError {
    if e.is_timeout() {
        HistoryError::Timeout {
            url: url.to_string(),
            secs,
        }
    } else {
        HistoryError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response, HistoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(HistoryError::Unauthorized {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Err(HistoryError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
