//! Session context: the credential and lightweight profile fields.
//!
//! A [`Session`] is read-only once built. Components receive it as
//! `Arc<Session>` and never look credentials up on their own, so a test can
//! hand in a fake session without touching the filesystem.
//!
//! [`SessionStore`] persists the session as a flat JSON object whose keys are
//! fixed: `token`, `email`, `firstname`, `lastname`, `photo`. Presence of
//! `token` is the only signal used to gate authenticated operations.

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Credential plus profile fields.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("photo", &self.photo)
            .finish()
    }
}

impl Session {
    /// A session holding only a credential.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// An empty, signed-out session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// The `Authorization` header value, `Token <credential>`.
    pub fn authorization(&self) -> Result<String, HistoryError> {
        match self.token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(format!("Token {t}")),
            _ => Err(HistoryError::MissingCredential),
        }
    }

    /// First and last name joined, falling back to the email.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            Some(parts.join(" "))
        }
    }
}

/// File-backed persistence for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory, e.g.
    /// `~/.config/docproc/session.json` on Linux.
    ///
    /// Override with `DOCPROC_SESSION_FILE`.
    pub fn default_location() -> Self {
        if let Ok(p) = std::env::var("DOCPROC_SESSION_FILE") {
            if !p.is_empty() {
                return Self::new(p);
            }
        }
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("docproc").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session; a missing file is a signed-out session.
    pub fn load(&self) -> Result<Session, HistoryError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return Ok(Session::anonymous());
            }
            Err(e) => return Err(self.error(e)),
        };
        serde_json::from_str(&raw).map_err(|e| self.error(e))
    }

    /// Persist the session atomically (temp file in the same dir + rename).
    pub fn save(&self, session: &Session) -> Result<(), HistoryError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;

        let json = serde_json::to_string_pretty(session).map_err(|e| self.error(e))?;
        let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| self.error(e))?;
        std::fs::write(tmp.path(), json).map_err(|e| self.error(e))?;
        tmp.persist(&self.path).map_err(|e| self.error(e.error))?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    /// Remove the persisted session. Clearing an absent session is fine.
    pub fn clear(&self) -> Result<(), HistoryError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, e: impl fmt::Display) -> HistoryError {
        HistoryError::Session {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_header_format() {
        let s = Session::with_token("abc123");
        assert!(s.is_authenticated());
        assert_eq!(s.authorization().unwrap(), "Token abc123");
    }

    #[test]
    fn blank_token_is_signed_out() {
        let s = Session::with_token("   ");
        assert!(!s.is_authenticated());
        assert!(matches!(
            s.authorization(),
            Err(HistoryError::MissingCredential)
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let s = Session::with_token("secret-value");
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("secret-value"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn display_name_fallbacks() {
        let mut s = Session::anonymous();
        assert_eq!(s.display_name(), None);
        s.email = Some("a@b.c".into());
        assert_eq!(s.display_name().as_deref(), Some("a@b.c"));
        s.firstname = Some("Sita".into());
        s.lastname = Some("Rai".into());
        assert_eq!(s.display_name().as_deref(), Some("Sita Rai"));
    }

    #[test]
    fn store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/session.json"));

        assert_eq!(store.load().unwrap(), Session::anonymous());

        let mut s = Session::with_token("t0k");
        s.email = Some("user@example.com".into());
        store.save(&s).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"token\""));
        assert!(raw.contains("\"email\""));
        assert!(!raw.contains("firstname"));

        assert_eq!(store.load().unwrap(), s);

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.load().unwrap().is_authenticated());
    }

    #[test]
    fn corrupt_file_is_session_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = SessionStore::new(&path).load().unwrap_err();
        assert!(matches!(err, HistoryError::Session { .. }));
    }
}
