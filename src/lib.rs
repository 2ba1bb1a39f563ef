pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::chrome::{ChromeSession, SessionOptions};
pub use adapters::ledger::JsonlLedger;
pub use config::CliConfig;
pub use core::engine::{AutomationEngine, EngineOptions};
pub use domain::model::{
    AttemptStatus, BatchResult, DocumentLink, DownloadAttempt, PortalCredentials,
};
pub use utils::error::{AutomationError, Result};
