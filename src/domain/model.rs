use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Per-run credentials for one portal. Supplied by the caller on every
/// invocation; the engine never persists them.
#[derive(Debug, Clone)]
pub struct PortalCredentials {
    pub login_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security_code: String,
    /// Path of the billing page, resolved against `login_url`.
    pub billing_path: String,
}

/// How to locate an element on the portal page.
///
/// Portals label their controls inconsistently, so strategy tables mix plain
/// CSS selectors with text lookups over button-like elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Css(Cow<'static, str>),
    ButtonText(Cow<'static, str>),
}

impl Matcher {
    pub fn css(selector: impl Into<Cow<'static, str>>) -> Self {
        Matcher::Css(selector.into())
    }

    pub fn button_text(text: impl Into<Cow<'static, str>>) -> Self {
        Matcher::ButtonText(text.into())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Css(selector) => write!(f, "css:{}", selector),
            Matcher::ButtonText(text) => write!(f, "text:{}", text),
        }
    }
}

/// A candidate document link discovered on the billing page. Ephemeral,
/// recomputed on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub href: String,
    pub label: String,
}

/// Raw product of one download event, staged in the session's scratch
/// directory before Download Capture persists and verifies it.
#[derive(Debug, Clone)]
pub struct CapturedDownload {
    pub staged_path: PathBuf,
    pub suggested_filename: Option<String>,
    pub url: String,
}

/// A persisted, size-verified download.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Completed,
    Failed,
}

/// One recorded outcome for one candidate document. Immutable once written;
/// every attempted link produces exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadAttempt {
    pub id: Uuid,
    pub owner: String,
    pub filename: String,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub status: AttemptStatus,
    pub error_message: Option<String>,
    pub source_url: String,
    pub portal_hostname: String,
    pub portal_url: String,
    pub timestamp: DateTime<Utc>,
}

impl DownloadAttempt {
    pub fn completed(
        owner: &str,
        saved: &SavedFile,
        link: &DocumentLink,
        portal_hostname: &str,
        portal_url: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            filename: saved.filename.clone(),
            file_path: saved.path.display().to_string(),
            file_size_bytes: saved.size_bytes,
            status: AttemptStatus::Completed,
            error_message: None,
            source_url: link.href.clone(),
            portal_hostname: portal_hostname.to_string(),
            portal_url: portal_url.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        owner: &str,
        link: &DocumentLink,
        error_message: String,
        portal_hostname: &str,
        portal_url: &str,
    ) -> Self {
        // No file was saved; record a synthetic placeholder name rather
        // than smuggling the link label into a filename field.
        let timestamp = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            filename: format!("failed_{}.pdf", timestamp.timestamp_millis()),
            file_path: String::new(),
            file_size_bytes: 0,
            status: AttemptStatus::Failed,
            error_message: Some(error_message),
            source_url: link.href.clone(),
            portal_hostname: portal_hostname.to_string(),
            portal_url: portal_url.to_string(),
            timestamp,
        }
    }
}

/// Ordered outcomes of one batch run. Returned to the caller; the individual
/// attempts are what gets persisted, not the batch itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub attempts: Vec<DownloadAttempt>,
    pub timestamp: DateTime<Utc>,
}

impl BatchResult {
    pub fn completed_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.attempts.len() - self.completed_count()
    }
}
