//! Batch orchestration: one browser session, sequential downloads,
//! partial failure as a first-class outcome.

use crate::core::{auth, capture, dialog, links};
use crate::domain::model::{
    BatchResult, DocumentLink, DownloadAttempt, Matcher, PortalCredentials, SavedFile,
};
use crate::domain::ports::{HistoryLedger, PortalDriver};
use crate::utils::error::{AutomationError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Base directory; files land under `<download_dir>/<owner>/`.
    pub download_dir: PathBuf,
    /// Logical owner of this run, namespacing the download directory.
    pub owner: String,
    pub max_downloads: usize,
    pub capture_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            owner: "local".to_string(),
            max_downloads: 10,
            capture_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives one automation run: login, billing navigation, link scan, then one
/// capture per link. Item failures are recorded and skipped over; only
/// launch/login/initial-navigation failures abort the run. The session is
/// torn down on every exit path.
pub struct AutomationEngine<D: PortalDriver, L: HistoryLedger> {
    driver: D,
    ledger: L,
    options: EngineOptions,
}

impl<D: PortalDriver, L: HistoryLedger> AutomationEngine<D, L> {
    pub fn new(driver: D, ledger: L, options: EngineOptions) -> Self {
        Self {
            driver,
            ledger,
            options,
        }
    }

    pub async fn run(&self, credentials: &PortalCredentials) -> Result<BatchResult> {
        let result = self.execute(credentials).await;
        self.driver.close().await;
        result
    }

    async fn execute(&self, credentials: &PortalCredentials) -> Result<BatchResult> {
        let portal_hostname = Url::parse(&credentials.login_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!(url = %credentials.login_url, "navigating to login page");
        self.driver.navigate(&credentials.login_url).await?;

        tracing::info!("logging in");
        auth::login(&self.driver, credentials).await?;

        let billing_url = billing_url(credentials)?;
        tracing::info!(url = %billing_url, "navigating to billing page");
        self.driver.navigate(&billing_url).await?;

        let links =
            links::discover(&self.driver, &billing_url, self.options.max_downloads).await?;

        let dest_dir = self.options.download_dir.join(&self.options.owner);
        let mut attempts = Vec::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            tracing::info!(
                item = index + 1,
                total = links.len(),
                href = %link.href,
                label = %link.label,
                "downloading"
            );

            let attempt = match self.try_download(link, &dest_dir).await {
                Ok(saved) => DownloadAttempt::completed(
                    &self.options.owner,
                    &saved,
                    link,
                    &portal_hostname,
                    &credentials.login_url,
                ),
                Err(e) => {
                    tracing::warn!(href = %link.href, error = %e, "download attempt failed");
                    DownloadAttempt::failed(
                        &self.options.owner,
                        link,
                        e.to_string(),
                        &portal_hostname,
                        &credentials.login_url,
                    )
                }
            };

            // A ledger hiccup must not cost the remaining items.
            if let Err(e) = self.ledger.record(&attempt).await {
                tracing::warn!(error = %e, "failed to record attempt in history ledger");
            }
            attempts.push(attempt);
        }

        let result = BatchResult {
            attempts,
            timestamp: Utc::now(),
        };
        tracing::info!(
            completed = result.completed_count(),
            failed = result.failed_count(),
            "batch finished"
        );
        Ok(result)
    }

    async fn try_download(&self, link: &DocumentLink, dest_dir: &Path) -> Result<SavedFile> {
        let driver = &self.driver;
        let anchor = Matcher::css(format!("a[href=\"{}\"]", link.href));
        let anchor = &anchor;
        let trigger = move || async move {
            driver.click(anchor).await?;
            let outcome = dialog::resolve(driver).await;
            tracing::debug!(?outcome, "dialog resolution finished");
            Ok(())
        };
        capture::capture(driver, dest_dir, self.options.capture_timeout, trigger).await
    }
}

fn billing_url(credentials: &PortalCredentials) -> Result<String> {
    let base = Url::parse(&credentials.login_url).map_err(|e| {
        AutomationError::InvalidConfigValue {
            field: "login_url".to_string(),
            value: credentials.login_url.clone(),
            reason: e.to_string(),
        }
    })?;
    let joined = base
        .join(&credentials.billing_path)
        .map_err(|e| AutomationError::InvalidConfigValue {
            field: "billing_path".to_string(),
            value: credentials.billing_path.clone(),
            reason: e.to_string(),
        })?;
    Ok(joined.to_string())
}
