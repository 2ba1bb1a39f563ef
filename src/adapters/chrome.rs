//! Session driver over a real Chromium instance, speaking CDP through
//! chromiumoxide. One `ChromeSession` per automation run; downloads are
//! staged under a session-private temp directory via
//! `Browser.setDownloadBehavior` and correlated to their trigger through
//! `downloadWillBegin`/`downloadProgress` events.

use crate::domain::model::{CapturedDownload, Matcher};
use crate::domain::ports::{DownloadWaiter, PortalDriver};
use crate::utils::error::{AutomationError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const EXISTENCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Elements that count as clickable "buttons" for text matching.
const BUTTON_CANDIDATES: &str =
    r#"button, input[type="button"], input[type="submit"], a[role="button"]"#;

/// Shared JS prelude: layout-based visibility, the closest equivalent to
/// what a user can actually see and click.
const VISIBLE_FN_JS: &str = r#"
const visible = (el) => {
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0
    && style.visibility !== 'hidden' && style.display !== 'none';
};
"#;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
        }
    }
}

pub struct ChromeSession {
    session_id: Uuid,
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    staging_dir: TempDir,
}

impl ChromeSession {
    /// Launch an isolated browser for one run. Download behavior is
    /// configured before any page is driven, so the very first click can
    /// already produce a correlated download event.
    pub async fn launch(options: &SessionOptions) -> Result<Self> {
        let session_id = Uuid::new_v4();
        let staging_dir = TempDir::new()?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1280, 1024)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(AutomationError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AutomationError::Launch(e.to_string()))?;

        // The handler stream must be drained for the whole session lifetime
        // or every CDP call deadlocks.
        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = browser.new_page("about:blank").await.map_err(driver_err)?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging_dir.path().to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(AutomationError::Launch)?;
        browser.execute(behavior).await.map_err(driver_err)?;

        tracing::info!(%session_id, staging = %staging_dir.path().display(), "browser session started");

        Ok(Self {
            session_id,
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            staging_dir,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    async fn eval_bool(&self, script: &str) -> Result<bool> {
        let value = self.evaluate_value(script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn evaluate_value(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.map_err(driver_err)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn exists(&self, matcher: &Matcher) -> Result<bool> {
        self.eval_bool(&exists_js(matcher)?).await
    }
}

#[async_trait]
impl PortalDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<(), CdpError>(())
        };
        match tokio::time::timeout(NAVIGATION_TIMEOUT, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AutomationError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(AutomationError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {NAVIGATION_TIMEOUT:?}"),
            }),
        }
    }

    async fn wait_for(&self, matcher: &Matcher, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(matcher).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(EXISTENCE_POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, matcher: &Matcher) -> Result<bool> {
        self.eval_bool(&visible_js(matcher)?).await
    }

    async fn fill(&self, matcher: &Matcher, value: &str) -> Result<()> {
        match matcher {
            Matcher::Css(selector) => {
                let element = self
                    .page
                    .find_element(selector.as_ref())
                    .await
                    .map_err(driver_err)?;
                element.focus().await.map_err(driver_err)?;
                element.type_str(value).await.map_err(driver_err)?;
                Ok(())
            }
            Matcher::ButtonText(_) => Err(AutomationError::Driver(format!(
                "fill is not supported for text matcher {matcher}"
            ))),
        }
    }

    async fn click(&self, matcher: &Matcher) -> Result<()> {
        match matcher {
            // A real input click; fails naturally when the element has no
            // clickable point, which is what we want for hidden controls.
            Matcher::Css(selector) => {
                let element = self
                    .page
                    .find_element(selector.as_ref())
                    .await
                    .map_err(driver_err)?;
                element.click().await.map_err(driver_err)?;
                Ok(())
            }
            Matcher::ButtonText(_) => {
                if self.eval_bool(&click_visible_text_js(matcher)?).await? {
                    Ok(())
                } else {
                    Err(AutomationError::Driver(format!(
                        "no visible element matching {matcher}"
                    )))
                }
            }
        }
    }

    async fn force_click(&self, matcher: &Matcher) -> Result<()> {
        if self.eval_bool(&force_click_js(matcher)?).await? {
            Ok(())
        } else {
            Err(AutomationError::Driver(format!(
                "no element matching {matcher}"
            )))
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.evaluate_value(script).await
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AutomationError::Navigation {
                url: "<post-submit>".to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(AutomationError::Navigation {
                url: "<post-submit>".to_string(),
                reason: format!("no navigation within {timeout:?}"),
            }),
        }
    }

    async fn arm_download(&self) -> Result<Box<dyn DownloadWaiter>> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| AutomationError::Driver("session already closed".to_string()))?;

        let will_begin = browser
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(driver_err)?
            .boxed();
        let progress = browser
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(driver_err)?
            .boxed();

        Ok(Box::new(ChromeDownloadWaiter {
            will_begin,
            progress,
            staging_dir: self.staging_dir.path().to_path_buf(),
        }))
    }

    async fn close(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!(session_id = %self.session_id, error = %e, "browser close reported an error");
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!(session_id = %self.session_id, error = %e, "browser process wait failed");
            }
            self.handler_task.abort();
            tracing::info!(session_id = %self.session_id, "browser session closed");
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromeDownloadWaiter {
    will_begin: BoxStream<'static, Arc<EventDownloadWillBegin>>,
    progress: BoxStream<'static, Arc<EventDownloadProgress>>,
    staging_dir: PathBuf,
}

impl ChromeDownloadWaiter {
    async fn next_completed(&mut self) -> Result<CapturedDownload> {
        let begin = self.will_begin.next().await.ok_or_else(stream_closed)?;
        tracing::debug!(guid = %begin.guid, url = %begin.url, "download started");

        loop {
            let event = self.progress.next().await.ok_or_else(stream_closed)?;
            if event.guid != begin.guid {
                continue;
            }
            match event.state {
                DownloadProgressState::Completed => break,
                DownloadProgressState::Canceled => {
                    return Err(AutomationError::Download(
                        "download canceled by the browser".to_string(),
                    ));
                }
                _ => {}
            }
        }

        let suggested = Some(begin.suggested_filename.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(CapturedDownload {
            staged_path: self.staging_dir.join(&begin.guid),
            suggested_filename: suggested,
            url: begin.url.clone(),
        })
    }
}

#[async_trait]
impl DownloadWaiter for ChromeDownloadWaiter {
    async fn wait(mut self: Box<Self>, timeout: Duration) -> Result<CapturedDownload> {
        match tokio::time::timeout(timeout, self.next_completed()).await {
            Ok(result) => result,
            Err(_) => Err(AutomationError::Download(
                "no download detected".to_string(),
            )),
        }
    }
}

fn driver_err(e: CdpError) -> AutomationError {
    AutomationError::Driver(e.to_string())
}

fn stream_closed() -> AutomationError {
    AutomationError::Download("download event stream closed".to_string())
}

fn js_string(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

fn exists_js(matcher: &Matcher) -> Result<String> {
    match matcher {
        Matcher::Css(selector) => {
            let sel = js_string(selector.as_ref())?;
            Ok(format!("!!document.querySelector({sel})"))
        }
        Matcher::ButtonText(text) => {
            let needle = js_string(text.as_ref())?;
            let cands = js_string(BUTTON_CANDIDATES)?;
            Ok(format!(
                r#"(() => {{
  const needle = {needle};
  return Array.from(document.querySelectorAll({cands}))
    .some(el => ((el.textContent || el.value || '').trim().includes(needle)));
}})()"#
            ))
        }
    }
}

fn visible_js(matcher: &Matcher) -> Result<String> {
    match matcher {
        Matcher::Css(selector) => {
            let sel = js_string(selector.as_ref())?;
            Ok(format!(
                r#"(() => {{
  {VISIBLE_FN_JS}
  const el = document.querySelector({sel});
  return !!el && visible(el);
}})()"#
            ))
        }
        Matcher::ButtonText(text) => {
            let needle = js_string(text.as_ref())?;
            let cands = js_string(BUTTON_CANDIDATES)?;
            Ok(format!(
                r#"(() => {{
  {VISIBLE_FN_JS}
  const needle = {needle};
  const el = Array.from(document.querySelectorAll({cands}))
    .find(el => ((el.textContent || el.value || '').trim().includes(needle)));
  return !!el && visible(el);
}})()"#
            ))
        }
    }
}

fn click_visible_text_js(matcher: &Matcher) -> Result<String> {
    let Matcher::ButtonText(text) = matcher else {
        return Err(AutomationError::Driver(
            "text click requested for a css matcher".to_string(),
        ));
    };
    let needle = js_string(text.as_ref())?;
    let cands = js_string(BUTTON_CANDIDATES)?;
    Ok(format!(
        r#"(() => {{
  {VISIBLE_FN_JS}
  const needle = {needle};
  const el = Array.from(document.querySelectorAll({cands}))
    .find(el => ((el.textContent || el.value || '').trim().includes(needle)) && visible(el));
  if (!el) return false;
  el.click();
  return true;
}})()"#
    ))
}

fn force_click_js(matcher: &Matcher) -> Result<String> {
    match matcher {
        Matcher::Css(selector) => {
            let sel = js_string(selector.as_ref())?;
            Ok(format!(
                r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  el.click();
  return true;
}})()"#
            ))
        }
        Matcher::ButtonText(text) => {
            let needle = js_string(text.as_ref())?;
            let cands = js_string(BUTTON_CANDIDATES)?;
            Ok(format!(
                r#"(() => {{
  const needle = {needle};
  const el = Array.from(document.querySelectorAll({cands}))
    .find(el => ((el.textContent || el.value || '').trim().includes(needle)));
  if (!el) return false;
  el.click();
  return true;
}})()"#
            ))
        }
    }
}
