//! Candidate document discovery on the billing page.

use crate::domain::model::DocumentLink;
use crate::domain::ports::PortalDriver;
use crate::utils::error::{AutomationError, Result};
use serde::Deserialize;

/// One scan over every anchor; filtering happens on this side.
const LINK_SCAN_JS: &str = r#"
Array.from(document.querySelectorAll('a')).map(a => ({
  href: a.href,
  text: (a.textContent || '').trim()
}))
"#;

#[derive(Debug, Deserialize)]
struct RawLink {
    href: String,
    text: String,
}

/// Scan the current page for qualifying document links, capped at `max`.
/// An empty result is a run-level failure: a billing page without a single
/// candidate means the navigation landed somewhere wrong.
pub async fn discover<D: PortalDriver + ?Sized>(
    driver: &D,
    page_url: &str,
    max: usize,
) -> Result<Vec<DocumentLink>> {
    let value = driver.evaluate(LINK_SCAN_JS).await?;
    let raw: Vec<RawLink> = serde_json::from_value(value)?;
    let total = raw.len();

    let links = filter_links(raw, max);
    tracing::info!(
        candidates = links.len(),
        scanned = total,
        "document links discovered"
    );

    if links.is_empty() {
        return Err(AutomationError::Navigation {
            url: page_url.to_string(),
            reason: "no download links found on the billing page".to_string(),
        });
    }
    Ok(links)
}

fn filter_links(raw: Vec<RawLink>, max: usize) -> Vec<DocumentLink> {
    raw.into_iter()
        .filter(|l| qualifies(&l.href, &l.text))
        .map(|l| DocumentLink {
            href: l.href,
            label: l.text,
        })
        .take(max)
        .collect()
}

/// A link qualifies on a file-extension hint or a download-ish label,
/// including the Japanese wording used by the supported portals.
fn qualifies(href: &str, label: &str) -> bool {
    href.contains(".pdf")
        || label.contains("ダウンロード")
        || label.to_lowercase().contains("download")
        || label.contains("PDF")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(href: &str, text: &str) -> RawLink {
        RawLink {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn qualifies_on_extension_or_label() {
        assert!(qualifies("https://p.example/inv/202406.pdf", ""));
        assert!(qualifies("https://p.example/doc?id=1", "ダウンロード"));
        assert!(qualifies("https://p.example/doc?id=2", "Download invoice"));
        assert!(qualifies("https://p.example/doc?id=3", "請求書PDF"));
        assert!(!qualifies("https://p.example/profile", "アカウント設定"));
    }

    #[test]
    fn download_label_matching_is_case_insensitive() {
        assert!(qualifies("https://p.example/doc", "download"));
        assert!(qualifies("https://p.example/doc", "DOWNLOAD"));
    }

    #[test]
    fn filter_caps_the_candidate_count() {
        let raw: Vec<RawLink> = (0..25)
            .map(|i| raw(&format!("https://p.example/{i}.pdf"), "invoice"))
            .collect();
        assert_eq!(filter_links(raw, 10).len(), 10);
    }

    #[test]
    fn filter_drops_non_matching_anchors() {
        let raw = vec![
            raw("https://p.example/a.pdf", "invoice"),
            raw("https://p.example/home", "home"),
            raw("https://p.example/doc", "PDFを開く"),
        ];
        let links = filter_links(raw, 10);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "https://p.example/a.pdf");
        assert_eq!(links[1].label, "PDFを開く");
    }
}
