//! Append-only history ledger backed by a newline-delimited JSON file.

use crate::domain::model::DownloadAttempt;
use crate::domain::ports::HistoryLedger;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every recorded attempt, oldest first.
    pub fn load(&self) -> Result<Vec<DownloadAttempt>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let mut attempts = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            attempts.push(serde_json::from_str(&line)?);
        }
        Ok(attempts)
    }
}

#[async_trait]
impl HistoryLedger for JsonlLedger {
    async fn record(&self, attempt: &DownloadAttempt) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(attempt)?;
        line.push('\n');

        // Open-append per write keeps interleaved writers row-consistent.
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
