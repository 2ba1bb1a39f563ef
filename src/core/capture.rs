//! Download capture: correlate one triggering action with the file it
//! produces, then persist and verify that file.

use crate::domain::model::{CapturedDownload, SavedFile};
use crate::domain::ports::PortalDriver;
use crate::utils::error::{AutomationError, Result};
use crate::utils::files;
use chrono::Utc;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Run `trigger` and capture the download it causes.
///
/// The waiter is armed before `trigger` executes. Arming afterwards would
/// race a fast download event and silently lose the file, so the ordering
/// here is a correctness requirement, not a style choice.
pub async fn capture<D, F, Fut>(
    driver: &D,
    dest_dir: &Path,
    timeout: Duration,
    trigger: F,
) -> Result<SavedFile>
where
    D: PortalDriver + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let waiter = driver.arm_download().await?;
    trigger().await?;
    let captured = waiter.wait(timeout).await?;
    persist(&captured, dest_dir)
}

/// Move a staged download into `dest_dir` under a sanitized, collision-free
/// name and verify the result by re-reading its metadata. A saved-but-empty
/// file is a failure, never a success.
pub fn persist(captured: &CapturedDownload, dest_dir: &Path) -> Result<SavedFile> {
    std::fs::create_dir_all(dest_dir)?;

    let filename = captured
        .suggested_filename
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(files::sanitize_filename)
        .unwrap_or_else(|| format!("invoice_{}.pdf", Utc::now().timestamp_millis()));

    let dest = files::unique_destination(dest_dir, &filename);
    move_file(&captured.staged_path, &dest)?;

    let size_bytes = match std::fs::metadata(&dest) {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(path = %dest.display(), error = %e, "saved file is unreadable");
            return Err(AutomationError::Download(
                "save verification failed".to_string(),
            ));
        }
    };
    if size_bytes == 0 {
        tracing::warn!(path = %dest.display(), "saved file is empty");
        return Err(AutomationError::Download(
            "save verification failed".to_string(),
        ));
    }

    let filename = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&filename)
        .to_string();
    tracing::info!(file = %filename, size_bytes, "download saved");

    Ok(SavedFile {
        filename,
        path: dest,
        size_bytes,
    })
}

// The staging directory may sit on another filesystem than the destination.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    if let Err(e) = std::fs::remove_file(from) {
        tracing::debug!(path = %from.display(), error = %e, "could not remove staged file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged(dir: &TempDir, name: &str, bytes: &[u8]) -> CapturedDownload {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        CapturedDownload {
            staged_path: path,
            suggested_filename: Some("invoice.pdf".to_string()),
            url: "https://portal.example/doc/1.pdf".to_string(),
        }
    }

    #[test]
    fn persist_moves_and_verifies_file() {
        let staging = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let captured = staged(&staging, "guid-1", b"%PDF-1.4 body");

        let saved = persist(&captured, dest.path()).unwrap();

        assert_eq!(saved.filename, "invoice.pdf");
        assert_eq!(saved.size_bytes, 13);
        assert!(saved.path.exists());
        assert!(!captured.staged_path.exists());
    }

    #[test]
    fn persist_rejects_empty_files() {
        let staging = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let captured = staged(&staging, "guid-2", b"");

        let err = persist(&captured, dest.path()).unwrap_err();
        assert!(matches!(err, AutomationError::Download(msg) if msg == "save verification failed"));
    }

    #[test]
    fn persist_disambiguates_colliding_names() {
        let staging = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let first = staged(&staging, "guid-3", b"first");
        let second = staged(&staging, "guid-4", b"second");

        let a = persist(&first, dest.path()).unwrap();
        let b = persist(&second, dest.path()).unwrap();

        assert_eq!(a.filename, "invoice.pdf");
        assert_eq!(b.filename, "invoice_1.pdf");
        assert_eq!(std::fs::read(&a.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"second");
    }

    #[test]
    fn persist_synthesizes_a_name_when_none_is_suggested() {
        let staging = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let mut captured = staged(&staging, "guid-5", b"bytes");
        captured.suggested_filename = None;

        let saved = persist(&captured, dest.path()).unwrap();
        assert!(saved.filename.starts_with("invoice_"));
        assert!(saved.filename.ends_with(".pdf"));
    }

    #[test]
    fn persist_sanitizes_hostile_suggested_names() {
        let staging = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let mut captured = staged(&staging, "guid-6", b"bytes");
        captured.suggested_filename = Some("../../escape.pdf".to_string());

        let saved = persist(&captured, dest.path()).unwrap();
        assert_eq!(saved.filename, "escape.pdf");
        assert_eq!(saved.path.parent().unwrap(), dest.path());
    }
}
