use crate::adapters::chrome::SessionOptions;
use crate::core::engine::EngineOptions;
use crate::domain::model::PortalCredentials;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_url, Validate,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "portal-fetch")]
#[command(about = "Automated invoice download from API-less web billing portals")]
pub struct CliConfig {
    /// Login page of the target portal.
    #[arg(long)]
    pub login_url: String,

    /// Security code the portal asks for on its login page.
    #[arg(long)]
    pub security_code: String,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Billing page path, resolved against the login URL.
    #[arg(long, default_value = "/billing/in")]
    pub billing_path: String,

    /// Base directory; files land under <download-dir>/<owner>/.
    #[arg(long, default_value = "./downloads")]
    pub download_dir: PathBuf,

    /// Logical owner of this run (e.g. a user id).
    #[arg(long, default_value = "local")]
    pub owner: String,

    #[arg(long, default_value = "./downloads/history.jsonl")]
    pub ledger_path: PathBuf,

    /// Cap on documents processed in one run.
    #[arg(long, default_value = "10")]
    pub max_downloads: usize,

    /// Seconds to wait for each download event.
    #[arg(long, default_value = "30")]
    pub capture_timeout_secs: u64,

    /// Run Chrome with a visible window.
    #[arg(long)]
    pub headful: bool,

    /// Use a specific Chrome/Chromium executable.
    #[arg(long)]
    pub chrome_executable: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("login_url", &self.login_url)?;
        validate_non_empty_string("security_code", &self.security_code)?;
        validate_non_empty_string("billing_path", &self.billing_path)?;
        validate_non_empty_string("owner", &self.owner)?;
        validate_range("max_downloads", self.max_downloads, 1, 100)?;
        validate_range("capture_timeout_secs", self.capture_timeout_secs, 1, 600)?;
        Ok(())
    }
}

impl CliConfig {
    pub fn credentials(&self) -> PortalCredentials {
        PortalCredentials {
            login_url: self.login_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            security_code: self.security_code.clone(),
            billing_path: self.billing_path.clone(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            download_dir: self.download_dir.clone(),
            owner: self.owner.clone(),
            max_downloads: self.max_downloads,
            capture_timeout: Duration::from_secs(self.capture_timeout_secs),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            headless: !self.headful,
            chrome_executable: self.chrome_executable.clone(),
        }
    }
}
