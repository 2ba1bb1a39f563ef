//! Confirmation dialog resolution.
//!
//! Some portals interpose a modal between the download click and the actual
//! file transfer; its markup is unknown in advance. Strategies run strictly
//! in order, from semantic visible interaction down to forced programmatic
//! interaction. A dialog that never appears is not an error: the download
//! timeout is the final arbiter.

use crate::core::selectors::{DIALOG_CONFIRM, DIALOG_CONFIRM_WAIT, DIALOG_DISMISS};
use crate::domain::model::Matcher;
use crate::domain::ports::PortalDriver;
use std::time::Duration;
use tokio::time::Instant;

const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Script probing for the download handler some portals expose globally.
const INVOKE_PAGE_HANDLER_JS: &str = r#"
(() => {
  if (typeof downloadFile === 'function') {
    downloadFile();
    return true;
  }
  return false;
})()
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    /// The canonical OK control became visible and was clicked.
    ClickedConfirm,
    /// A dismiss-table entry was found visible and clicked.
    ClickedDismiss,
    /// The page's own download handler was invoked directly.
    InvokedPageHandler,
    /// The OK control was force-clicked while reporting as not visible.
    ForcedClick,
    /// Every strategy was exhausted; the flow proceeds regardless.
    Unresolved,
}

/// Try to dismiss whatever confirmation dialog the triggering click opened.
/// Never fails; driver errors inside a strategy demote it to the next one.
pub async fn resolve<D: PortalDriver + ?Sized>(driver: &D) -> DialogOutcome {
    if poll_visible(driver, &DIALOG_CONFIRM, DIALOG_CONFIRM_WAIT).await {
        match driver.click(&DIALOG_CONFIRM).await {
            Ok(()) => {
                tracing::debug!("confirm control clicked");
                return DialogOutcome::ClickedConfirm;
            }
            Err(e) => tracing::debug!(error = %e, "visible confirm control rejected the click"),
        }
    } else {
        tracing::debug!(
            "confirm control not visible after {:?}",
            DIALOG_CONFIRM_WAIT
        );
    }

    for matcher in DIALOG_DISMISS {
        match driver.is_visible(matcher).await {
            Ok(true) => match driver.click(matcher).await {
                Ok(()) => {
                    tracing::debug!(%matcher, "dismiss control clicked");
                    return DialogOutcome::ClickedDismiss;
                }
                Err(e) => tracing::debug!(%matcher, error = %e, "dismiss click failed, trying next"),
            },
            // Exists-but-hidden and not-found both mean: move on.
            Ok(false) => tracing::trace!(%matcher, "not visible, skipping"),
            Err(e) => tracing::debug!(%matcher, error = %e, "visibility check failed, skipping"),
        }
    }

    match driver.evaluate(INVOKE_PAGE_HANDLER_JS).await {
        Ok(value) if value.as_bool() == Some(true) => {
            tracing::debug!("page download handler invoked directly");
            return DialogOutcome::InvokedPageHandler;
        }
        Ok(_) => tracing::debug!("page exposes no download handler"),
        Err(e) => tracing::debug!(error = %e, "handler probe failed"),
    }

    match driver.force_click(&DIALOG_CONFIRM).await {
        Ok(()) => {
            tracing::debug!("confirm control force-clicked");
            DialogOutcome::ForcedClick
        }
        Err(e) => {
            tracing::warn!(error = %e, "dialog resolution exhausted, proceeding to download timeout");
            DialogOutcome::Unresolved
        }
    }
}

/// Bounded visibility poll. A driver error during polling counts as
/// not-visible for that tick.
async fn poll_visible<D: PortalDriver + ?Sized>(
    driver: &D,
    matcher: &Matcher,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if driver.is_visible(matcher).await.unwrap_or(false) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
    }
}
