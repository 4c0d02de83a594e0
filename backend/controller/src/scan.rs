//! Scanner round-trips and the inject-and-retry recovery path.

use std::time::Duration;

use anyhow::anyhow;
use pagesight_core::{
    DocumentRasterizer, OcrProvider, PageHandle, PageSightError, PageSnapshot, PageTransport,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// How long one snapshot request may take before the scanner counts as absent.
    pub timeout: Duration,
    /// Pause between injecting the scanner and retrying.
    pub retry_delay: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5), retry_delay: Duration::from_millis(500) }
    }
}

/// Request a snapshot; if no scanner answers, inject one and retry exactly once.
pub async fn request_with_recovery(
    transport: &dyn PageTransport,
    page: &PageHandle,
    settings: &ScanSettings,
) -> Result<PageSnapshot, PageSightError> {
    if let Some(snapshot) = attempt(transport, page, settings, 1).await {
        return Ok(snapshot);
    }

    info!("[Scan] no scanner on {}, injecting", page);
    if let Err(e) = transport.inject_scanner(page).await {
        // A failed injection still gets its retry; the page may have a scanner by now.
        warn!("[Scan] inject into {} failed: {:#}", page, e);
    }
    tokio::time::sleep(settings.retry_delay).await;

    attempt(transport, page, settings, 2)
        .await
        .ok_or_else(|| PageSightError::PageInaccessible(page.to_string()))
}

/// One bounded request. Timeout, transport error, and "no answer" all read as absent.
async fn attempt(
    transport: &dyn PageTransport,
    page: &PageHandle,
    settings: &ScanSettings,
    number: u8,
) -> Option<PageSnapshot> {
    match tokio::time::timeout(settings.timeout, transport.request_snapshot(page)).await {
        Ok(Ok(Some(snapshot))) => {
            debug!(attempt = number, "[Scan] snapshot received from {}", page);
            Some(snapshot)
        }
        Ok(Ok(None)) => {
            debug!(attempt = number, "[Scan] scanner did not answer on {}", page);
            None
        }
        Ok(Err(e)) => {
            debug!(attempt = number, "[Scan] request to {} failed: {:#}", page, e);
            None
        }
        Err(_) => {
            debug!(
                attempt = number,
                "[Scan] request to {} timed out after {} ms",
                page,
                settings.timeout.as_millis()
            );
            None
        }
    }
}

/// Text of a document target: rasterize its first page, then OCR it.
pub async fn read_document(
    rasterizer: Option<&dyn DocumentRasterizer>,
    ocr: &dyn OcrProvider,
    href: &str,
    timeout: Duration,
) -> Result<String, PageSightError> {
    let rasterizer =
        rasterizer.ok_or_else(|| PageSightError::Other(anyhow!("no document rasterizer configured")))?;
    let work = async {
        let page = rasterizer.rasterize(href).await?;
        ocr.ocr(&page).await
    };
    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(PageSightError::provider("ocr", format!("{e:#}"))),
        Err(_) => Err(PageSightError::Timeout(timeout.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use pagesight_core::ImageSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers only after `answers_after` injections have happened.
    struct FakeTransport {
        answers_after: usize,
        injected: AtomicUsize,
        requests: AtomicUsize,
        error_instead_of_none: bool,
    }

    impl FakeTransport {
        fn new(answers_after: usize) -> Self {
            Self {
                answers_after,
                injected: AtomicUsize::new(0),
                requests: AtomicUsize::new(0),
                error_instead_of_none: false,
            }
        }
    }

    #[async_trait]
    impl PageTransport for FakeTransport {
        async fn request_snapshot(&self, _page: &PageHandle) -> anyhow::Result<Option<PageSnapshot>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.injected.load(Ordering::SeqCst) >= self.answers_after {
                return Ok(Some(PageSnapshot {
                    title: "Found".into(),
                    url: "https://x".into(),
                    timestamp: Utc::now(),
                    headings: vec![],
                    main_text: vec![],
                    images: vec![],
                    links: vec![],
                    pdfs: vec![],
                }));
            }
            if self.error_instead_of_none {
                anyhow::bail!("Receiving end does not exist");
            }
            Ok(None)
        }

        async fn inject_scanner(&self, _page: &PageHandle) -> anyhow::Result<()> {
            self.injected.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings() -> ScanSettings {
        ScanSettings { timeout: Duration::from_millis(200), retry_delay: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn present_scanner_needs_no_injection() {
        let transport = FakeTransport::new(0);
        let snap = request_with_recovery(&transport, &PageHandle::new("p"), &settings()).await.unwrap();
        assert_eq!(snap.title, "Found");
        assert_eq!(transport.injected.load(Ordering::SeqCst), 0);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_scanner_is_injected_then_retried() {
        let mut transport = FakeTransport::new(1);
        transport.error_instead_of_none = true;
        let snap = request_with_recovery(&transport, &PageHandle::new("p"), &settings()).await.unwrap();
        assert_eq!(snap.title, "Found");
        assert_eq!(transport.injected.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_failure_is_terminal() {
        let transport = FakeTransport::new(usize::MAX);
        let err = request_with_recovery(&transport, &PageHandle::new("p"), &settings()).await.unwrap_err();
        assert!(matches!(err, PageSightError::PageInaccessible(_)));
        assert_eq!(transport.injected.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 2);
    }

    struct HangingTransport;

    #[async_trait]
    impl PageTransport for HangingTransport {
        async fn request_snapshot(&self, _page: &PageHandle) -> anyhow::Result<Option<PageSnapshot>> {
            futures::future::pending().await
        }

        async fn inject_scanner(&self, _page: &PageHandle) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn timeouts_count_as_absent() {
        let settings = ScanSettings { timeout: Duration::from_millis(5), retry_delay: Duration::from_millis(1) };
        let err = request_with_recovery(&HangingTransport, &PageHandle::new("p"), &settings).await.unwrap_err();
        assert!(matches!(err, PageSightError::PageInaccessible(_)));
    }

    struct Raster;

    #[async_trait]
    impl DocumentRasterizer for Raster {
        async fn rasterize(&self, _href: &str) -> anyhow::Result<ImageSource> {
            Ok(ImageSource::png(vec![1u8, 2, 3]))
        }
    }

    struct Ocr;

    #[async_trait]
    impl OcrProvider for Ocr {
        async fn ocr(&self, image: &ImageSource) -> anyhow::Result<String> {
            Ok(format!("  text from {}  ", image.describe()))
        }
    }

    #[tokio::test]
    async fn document_text_goes_through_rasterizer_then_ocr() {
        let text = read_document(Some(&Raster), &Ocr, "https://x/a.pdf", Duration::from_secs(1)).await.unwrap();
        assert_eq!(text, "text from <3 bytes image/png>");

        let err = read_document(None, &Ocr, "https://x/a.pdf", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, PageSightError::Other(_)));
    }
}
