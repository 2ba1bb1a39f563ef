//! Portal login over ordered selector fallbacks.

use crate::core::selectors::{
    PASSWORD_FIELD, PASSWORD_FIELD_TIMEOUT, POST_SUBMIT_TIMEOUT, SECURITY_CODE_FIELD,
    SECURITY_CODE_TIMEOUT, SUBMIT_CONTROLS, USERNAME_FIELDS, USERNAME_FIELD_TIMEOUT,
};
use crate::domain::model::PortalCredentials;
use crate::domain::ports::PortalDriver;
use crate::utils::error::{AutomationError, Result};

/// Complete the login flow on the already-loaded login page.
///
/// The security code field is the only hard requirement; username and
/// password are filled opportunistically when the portal presents them.
/// Fails with a login error only when the security code field never appears
/// or every submit strategy is exhausted.
pub async fn login<D: PortalDriver + ?Sized>(
    driver: &D,
    credentials: &PortalCredentials,
) -> Result<()> {
    if !driver
        .wait_for(&SECURITY_CODE_FIELD, SECURITY_CODE_TIMEOUT)
        .await?
    {
        return Err(AutomationError::Login(
            "security code field not found on login page".to_string(),
        ));
    }
    tracing::debug!("filling security code");
    driver
        .fill(&SECURITY_CODE_FIELD, &credentials.security_code)
        .await?;

    if let Some(username) = &credentials.username {
        let mut filled = false;
        for matcher in USERNAME_FIELDS {
            if driver.wait_for(matcher, USERNAME_FIELD_TIMEOUT).await? {
                tracing::debug!(%matcher, "filling username");
                driver.fill(matcher, username).await?;
                filled = true;
                break;
            }
        }
        if !filled {
            tracing::debug!("no username field matched, continuing");
        }
    }

    if let Some(password) = &credentials.password {
        if driver
            .wait_for(&PASSWORD_FIELD, PASSWORD_FIELD_TIMEOUT)
            .await?
        {
            tracing::debug!("filling password");
            driver.fill(&PASSWORD_FIELD, password).await?;
        } else {
            tracing::debug!("password field not found, continuing");
        }
    }

    for matcher in SUBMIT_CONTROLS {
        match driver.click(matcher).await {
            Ok(()) => {
                if let Err(e) = driver.wait_for_navigation(POST_SUBMIT_TIMEOUT).await {
                    tracing::debug!(%matcher, error = %e, "post-submit navigation did not complete, trying next control");
                    continue;
                }
                tracing::info!(%matcher, "login submitted");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%matcher, error = %e, "submit control did not accept a click, trying next");
            }
        }
    }

    Err(AutomationError::Login(
        "no submit control matched".to_string(),
    ))
}
