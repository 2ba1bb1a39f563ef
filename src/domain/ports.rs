use crate::domain::model::{CapturedDownload, DownloadAttempt, Matcher};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// One isolated browser session. Exactly one exists per run; `close` is
/// always invoked on the terminating path and must never fail.
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Navigate the session's page and wait for it to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until an element matching `matcher` exists, up to `timeout`.
    /// Returns `false` on timeout; `Err` only on driver failure.
    async fn wait_for(&self, matcher: &Matcher, timeout: Duration) -> Result<bool>;

    /// Whether a matching element currently exists and is visible.
    async fn is_visible(&self, matcher: &Matcher) -> Result<bool>;

    /// Fill the first matching input with `value`.
    async fn fill(&self, matcher: &Matcher, value: &str) -> Result<()>;

    /// Click the first matching element.
    async fn click(&self, matcher: &Matcher) -> Result<()>;

    /// Click the first matching element even if it is not visible. Covers
    /// portals that render controls off-screen or with zero opacity.
    async fn force_click(&self, matcher: &Matcher) -> Result<()>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Wait for the next page transition, up to `timeout`.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()>;

    /// Subscribe to the next download event. The returned waiter is live as
    /// soon as this call returns, so arming it before the triggering click
    /// cannot lose a fast download event.
    async fn arm_download(&self) -> Result<Box<dyn DownloadWaiter>>;

    /// Tear the session down. Idempotent; logs and swallows secondary errors.
    async fn close(&self);
}

/// Handle to a download event armed before its trigger.
#[async_trait]
pub trait DownloadWaiter: Send {
    /// Await the captured file, up to `timeout`.
    async fn wait(self: Box<Self>, timeout: Duration) -> Result<CapturedDownload>;
}

/// Append-only record of attempts, consumed by external collaborators.
#[async_trait]
pub trait HistoryLedger: Send + Sync {
    async fn record(&self, attempt: &DownloadAttempt) -> Result<()>;
}
