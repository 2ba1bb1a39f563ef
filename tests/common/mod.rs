#![allow(dead_code)]

use async_trait::async_trait;
use portal_fetch::domain::model::{CapturedDownload, Matcher};
use portal_fetch::domain::ports::{DownloadWaiter, PortalDriver};
use portal_fetch::utils::error::{AutomationError, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted behavior for one armed download.
#[derive(Debug, Clone)]
pub enum MockDownload {
    File {
        suggested: Option<String>,
        bytes: Vec<u8>,
    },
    Timeout,
}

struct Inner {
    exists: Mutex<HashSet<String>>,
    visible: Mutex<HashSet<String>>,
    failing_urls: Mutex<Vec<String>>,
    page_links: Mutex<serde_json::Value>,
    page_handler_available: Mutex<bool>,
    downloads: Mutex<VecDeque<MockDownload>>,
    log: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
    staging: TempDir,
    staged_counter: AtomicUsize,
}

/// A scripted portal stand-in: tests declare which selectors exist, which
/// are visible, what the anchor scan returns, and what each armed download
/// produces. Every driver call is logged for ordering assertions.
#[derive(Clone)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                exists: Mutex::new(HashSet::new()),
                visible: Mutex::new(HashSet::new()),
                failing_urls: Mutex::new(Vec::new()),
                page_links: Mutex::new(serde_json::json!([])),
                page_handler_available: Mutex::new(false),
                downloads: Mutex::new(VecDeque::new()),
                log: Mutex::new(Vec::new()),
                close_calls: AtomicUsize::new(0),
                staging: TempDir::new().expect("staging dir"),
                staged_counter: AtomicUsize::new(0),
            }),
        }
    }

    /// A portal whose login page works with the default strategy tables.
    pub fn with_working_login() -> Self {
        let driver = Self::new();
        driver.add_existing(&Matcher::css("input[type=\"text\"]"));
        driver.add_existing(&Matcher::css("button[type=\"submit\"]"));
        driver
    }

    pub fn add_existing(&self, matcher: &Matcher) {
        self.inner.exists.lock().unwrap().insert(matcher.to_string());
    }

    pub fn add_visible(&self, matcher: &Matcher) {
        self.add_existing(matcher);
        self.inner
            .visible
            .lock()
            .unwrap()
            .insert(matcher.to_string());
    }

    pub fn fail_navigation_to(&self, url_fragment: &str) {
        self.inner
            .failing_urls
            .lock()
            .unwrap()
            .push(url_fragment.to_string());
    }

    /// Script the billing page anchors and make each one clickable.
    pub fn set_links(&self, links: &[(&str, &str)]) {
        let json: Vec<serde_json::Value> = links
            .iter()
            .map(|(href, text)| serde_json::json!({"href": href, "text": text}))
            .collect();
        for (href, _) in links {
            self.add_existing(&Matcher::css(format!("a[href=\"{href}\"]")));
        }
        *self.inner.page_links.lock().unwrap() = serde_json::Value::Array(json);
    }

    pub fn set_page_handler_available(&self, available: bool) {
        *self.inner.page_handler_available.lock().unwrap() = available;
    }

    pub fn push_download(&self, download: MockDownload) {
        self.inner.downloads.lock().unwrap().push_back(download);
    }

    pub fn push_file(&self, suggested: &str, bytes: &[u8]) {
        self.push_download(MockDownload::File {
            suggested: Some(suggested.to_string()),
            bytes: bytes.to_vec(),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.log.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub fn call_position(&self, entry: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == entry)
    }

    fn log(&self, entry: String) {
        self.inner.log.lock().unwrap().push(entry);
    }

    fn has(&self, matcher: &Matcher) -> bool {
        self.inner
            .exists
            .lock()
            .unwrap()
            .contains(&matcher.to_string())
    }

    fn sees(&self, matcher: &Matcher) -> bool {
        self.inner
            .visible
            .lock()
            .unwrap()
            .contains(&matcher.to_string())
    }
}

#[async_trait]
impl PortalDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.log(format!("navigate:{url}"));
        let failing = self.inner.failing_urls.lock().unwrap().clone();
        if failing.iter().any(|f| url.contains(f)) {
            return Err(AutomationError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for(&self, matcher: &Matcher, _timeout: Duration) -> Result<bool> {
        self.log(format!("wait_for:{matcher}"));
        Ok(self.has(matcher))
    }

    async fn is_visible(&self, matcher: &Matcher) -> Result<bool> {
        Ok(self.sees(matcher))
    }

    async fn fill(&self, matcher: &Matcher, value: &str) -> Result<()> {
        self.log(format!("fill:{matcher}={value}"));
        if self.has(matcher) {
            Ok(())
        } else {
            Err(AutomationError::Driver(format!(
                "no element matching {matcher}"
            )))
        }
    }

    async fn click(&self, matcher: &Matcher) -> Result<()> {
        self.log(format!("click:{matcher}"));
        if self.has(matcher) {
            Ok(())
        } else {
            Err(AutomationError::Driver(format!(
                "no element matching {matcher}"
            )))
        }
    }

    async fn force_click(&self, matcher: &Matcher) -> Result<()> {
        self.log(format!("force_click:{matcher}"));
        if self.has(matcher) {
            Ok(())
        } else {
            Err(AutomationError::Driver(format!(
                "no element matching {matcher}"
            )))
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        if script.contains("querySelectorAll('a')") {
            self.log("scan_links".to_string());
            return Ok(self.inner.page_links.lock().unwrap().clone());
        }
        if script.contains("downloadFile") {
            self.log("probe_page_handler".to_string());
            let available = *self.inner.page_handler_available.lock().unwrap();
            return Ok(serde_json::Value::Bool(available));
        }
        Ok(serde_json::Value::Null)
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<()> {
        self.log("wait_for_navigation".to_string());
        Ok(())
    }

    async fn arm_download(&self) -> Result<Box<dyn DownloadWaiter>> {
        self.log("arm_download".to_string());
        let next = self
            .inner
            .downloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockDownload::Timeout);
        let staged_path = self.inner.staging.path().join(format!(
            "staged-{}",
            self.inner.staged_counter.fetch_add(1, Ordering::SeqCst)
        ));
        Ok(Box::new(MockWaiter {
            behavior: next,
            staged_path,
        }))
    }

    async fn close(&self) {
        self.log("close".to_string());
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockWaiter {
    behavior: MockDownload,
    staged_path: std::path::PathBuf,
}

#[async_trait]
impl DownloadWaiter for MockWaiter {
    async fn wait(self: Box<Self>, _timeout: Duration) -> Result<CapturedDownload> {
        match self.behavior {
            MockDownload::File { suggested, bytes } => {
                std::fs::write(&self.staged_path, &bytes)?;
                Ok(CapturedDownload {
                    staged_path: self.staged_path,
                    suggested_filename: suggested,
                    url: "https://portal.example/file".to_string(),
                })
            }
            MockDownload::Timeout => Err(AutomationError::Download(
                "no download detected".to_string(),
            )),
        }
    }
}
