use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::stream::{self, Stream};
use pagesight_core::{
    CaptionProvider, DocumentRasterizer, EnrichedSnapshot, EnrichmentStatus, ImageSource,
    OcrProvider, DESCRIPTION_UNAVAILABLE,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::worklist::{build_worklist, WorkItem};

/// Recorded when OCR succeeds but finds nothing.
pub const NO_TEXT_FOUND: &str = "No readable text found.";

/// Providers the pipeline calls. Without a rasterizer the PDF branch is off.
#[derive(Clone)]
pub struct EnrichmentProviders {
    pub caption: Arc<dyn CaptionProvider>,
    pub ocr: Arc<dyn OcrProvider>,
    pub rasterizer: Option<Arc<dyn DocumentRasterizer>>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub enrich_pdfs: bool,
    /// Upper bound on a single provider call; exceeding it counts as a failure.
    pub item_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { enrich_pdfs: true, item_timeout: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Described(String),
    Failed(String),
}

/// One emission of the pipeline: an item finished and the snapshot reflecting it.
#[derive(Debug, Clone)]
pub struct EnrichmentUpdate {
    /// Position in the worklist; strictly increasing across a run.
    pub position: usize,
    pub total: usize,
    pub item: WorkItem,
    pub outcome: ItemOutcome,
    pub snapshot: EnrichedSnapshot,
}

/// Side-channel notifications for observers that want the "in progress" marker.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { position: usize, total: usize, item: WorkItem, snapshot: EnrichedSnapshot },
    Finished { total: usize, failed: usize },
}

struct Run {
    snapshot: EnrichedSnapshot,
    worklist: Vec<WorkItem>,
    position: usize,
    failed: usize,
    providers: EnrichmentProviders,
    options: PipelineOptions,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

/// Enrich `snapshot`, yielding one update per work item.
///
/// The stream is lazy (nothing runs until polled), finite, and consumed by
/// value, so a run cannot be restarted.
pub fn enrich(
    snapshot: EnrichedSnapshot,
    providers: EnrichmentProviders,
    options: PipelineOptions,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
) -> impl Stream<Item = EnrichmentUpdate> + Send {
    let include_pdfs = options.enrich_pdfs && providers.rasterizer.is_some();
    let worklist = build_worklist(&snapshot, include_pdfs);
    info!(
        "[Pipeline] {} item(s) to enrich for {}",
        worklist.len(),
        snapshot.url
    );

    let run = Run { snapshot, worklist, position: 0, failed: 0, providers, options, progress };
    stream::unfold(run, |mut run| async move {
        let update = run.step().await?;
        Some((update, run))
    })
}

impl Run {
    async fn step(&mut self) -> Option<EnrichmentUpdate> {
        let total = self.worklist.len();
        let Some(item) = self.worklist.get(self.position).cloned() else {
            if let Some(tx) = self.progress.take() {
                let _ = tx.send(ProgressEvent::Finished { total, failed: self.failed });
            }
            return None;
        };
        let position = self.position;
        self.position += 1;

        self.set_status(&item, EnrichmentStatus::InProgress);
        if let Some(tx) = &self.progress {
            let _ = tx.send(ProgressEvent::Started {
                position,
                total,
                item: item.clone(),
                snapshot: self.snapshot.clone(),
            });
        }

        let outcome = match tokio::time::timeout(self.options.item_timeout, self.describe(&item)).await {
            Ok(Ok(text)) => ItemOutcome::Described(text),
            Ok(Err(e)) => ItemOutcome::Failed(e.to_string()),
            Err(_) => ItemOutcome::Failed(format!(
                "timed out after {} ms",
                self.options.item_timeout.as_millis()
            )),
        };

        match &outcome {
            ItemOutcome::Described(_) => {
                debug!("[Pipeline] {} enriched ({}/{})", item.id(), position + 1, total)
            }
            ItemOutcome::Failed(reason) => {
                self.failed += 1;
                warn!("[Pipeline] {} failed ({}/{}): {}", item.id(), position + 1, total, reason);
            }
        }
        self.apply(&item, &outcome);

        Some(EnrichmentUpdate { position, total, item, outcome, snapshot: self.snapshot.clone() })
    }

    async fn describe(&self, item: &WorkItem) -> Result<String> {
        let text = match item {
            WorkItem::Image { src, ocr: true, .. } => {
                let text = self.providers.ocr.ocr(&ImageSource::Url(src.clone())).await?;
                non_empty_ocr(text)
            }
            WorkItem::Image { src, ocr: false, .. } => {
                self.providers.caption.caption(&ImageSource::Url(src.clone())).await?
            }
            WorkItem::Pdf { href, .. } => {
                let rasterizer = self
                    .providers
                    .rasterizer
                    .as_ref()
                    .ok_or_else(|| anyhow!("no document rasterizer configured"))?;
                let page = rasterizer.rasterize(href).await?;
                non_empty_ocr(self.providers.ocr.ocr(&page).await?)
            }
        };
        Ok(text.trim().to_string())
    }

    fn set_status(&mut self, item: &WorkItem, status: EnrichmentStatus) {
        let snap = self.snapshot.make_mut();
        match item {
            WorkItem::Image { index, .. } => {
                if let Some(img) = snap.images.get_mut(*index) {
                    img.status = status;
                }
            }
            WorkItem::Pdf { index, .. } => {
                if let Some(pdf) = snap.pdfs.get_mut(*index) {
                    pdf.status = status;
                }
            }
        }
    }

    /// Write the outcome into the item in one step so readers never see half an update.
    fn apply(&mut self, item: &WorkItem, outcome: &ItemOutcome) {
        let (description, status) = match outcome {
            ItemOutcome::Described(text) => (text.clone(), EnrichmentStatus::Complete),
            ItemOutcome::Failed(_) => (DESCRIPTION_UNAVAILABLE.to_string(), EnrichmentStatus::Failed),
        };
        let snap = self.snapshot.make_mut();
        match item {
            WorkItem::Image { index, ocr, .. } => {
                if let Some(img) = snap.images.get_mut(*index) {
                    if status == EnrichmentStatus::Complete {
                        img.alt_text = synthesize_alt_text(&description, *ocr);
                    }
                    img.ai_description = Some(description);
                    img.status = status;
                }
            }
            WorkItem::Pdf { index, .. } => {
                if let Some(pdf) = snap.pdfs.get_mut(*index) {
                    pdf.ai_description = Some(description);
                    pdf.status = status;
                }
            }
        }
    }
}

fn non_empty_ocr(text: String) -> String {
    if text.trim().is_empty() {
        NO_TEXT_FOUND.to_string()
    } else {
        text
    }
}

/// Replacement alt text for an image that had none.
pub fn synthesize_alt_text(description: &str, from_ocr: bool) -> String {
    if from_ocr {
        format!("Text in image: {description}")
    } else {
        format!("AI description: {description}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures::StreamExt;
    use pagesight_core::{Dimensions, ImageRecord, PageSnapshot, PdfRef};
    use std::sync::Mutex;

    /// Records every URL it is asked about; fails for URLs in `fail_on`.
    #[derive(Default)]
    struct FakeVision {
        calls: Mutex<Vec<String>>,
        fail_on: Vec<String>,
    }

    impl FakeVision {
        fn failing(urls: &[&str]) -> Self {
            Self { calls: Mutex::new(Vec::new()), fail_on: urls.iter().map(|u| u.to_string()).collect() }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, image: &ImageSource, prefix: &str) -> Result<String> {
            let key = image.describe();
            self.calls.lock().unwrap().push(key.clone());
            if self.fail_on.contains(&key) {
                anyhow::bail!("model unavailable");
            }
            Ok(format!("{prefix} {key}"))
        }
    }

    #[async_trait]
    impl CaptionProvider for FakeVision {
        async fn caption(&self, image: &ImageSource) -> Result<String> {
            self.record(image, "caption of")
        }
    }

    #[async_trait]
    impl OcrProvider for FakeVision {
        async fn ocr(&self, image: &ImageSource) -> Result<String> {
            self.record(image, "text of")
        }
    }

    struct FakeRasterizer;

    #[async_trait]
    impl DocumentRasterizer for FakeRasterizer {
        async fn rasterize(&self, _href: &str) -> Result<ImageSource> {
            Ok(ImageSource::png(vec![0u8; 4]))
        }
    }

    fn image(i: usize, accessible: bool, ocr: bool) -> ImageRecord {
        ImageRecord {
            id: format!("img-{i}"),
            src: format!("https://x/{i}.png"),
            alt_text: if accessible { "A described picture".into() } else { String::new() },
            is_accessible: accessible,
            is_ocr_candidate: ocr,
            dimensions: Dimensions { width: 200, height: 200 },
            ai_description: None,
            status: EnrichmentStatus::Pending,
        }
    }

    fn snapshot(images: Vec<ImageRecord>, pdfs: Vec<PdfRef>) -> EnrichedSnapshot {
        EnrichedSnapshot::new(PageSnapshot {
            title: "t".into(),
            url: "https://x".into(),
            timestamp: Utc::now(),
            headings: vec![],
            main_text: vec![],
            images,
            links: vec![],
            pdfs,
        })
    }

    fn providers(vision: Arc<FakeVision>, rasterizer: bool) -> EnrichmentProviders {
        EnrichmentProviders {
            caption: vision.clone(),
            ocr: vision,
            rasterizer: if rasterizer { Some(Arc::new(FakeRasterizer)) } else { None },
        }
    }

    #[tokio::test]
    async fn accessible_images_never_reach_a_provider() {
        let vision = Arc::new(FakeVision::default());
        let snap = snapshot(vec![image(0, true, false), image(1, false, false), image(2, true, true)], vec![]);
        let updates: Vec<_> = enrich(snap, providers(vision.clone(), false), PipelineOptions::default(), None)
            .collect()
            .await;
        assert_eq!(updates.len(), 1);
        assert_eq!(vision.calls(), vec!["https://x/1.png".to_string()]);
    }

    #[tokio::test]
    async fn failure_writes_sentinel_and_continues_in_order() {
        let vision = Arc::new(FakeVision::failing(&["https://x/2.png"]));
        let snap = snapshot((0..5).map(|i| image(i, false, false)).collect(), vec![]);
        let updates: Vec<_> = enrich(snap, providers(vision.clone(), false), PipelineOptions::default(), None)
            .collect()
            .await;

        let positions: Vec<_> = updates.iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);

        let failed = &updates[2];
        assert!(matches!(failed.outcome, ItemOutcome::Failed(_)));
        assert_eq!(failed.snapshot.images[2].ai_description.as_deref(), Some(DESCRIPTION_UNAVAILABLE));
        assert_eq!(failed.snapshot.images[2].status, EnrichmentStatus::Failed);

        let last = &updates[4].snapshot;
        assert_eq!(last.images[3].status, EnrichmentStatus::Complete);
        assert_eq!(last.images[4].alt_text, "AI description: caption of https://x/4.png");
        assert_eq!(vision.calls().len(), 5);
    }

    #[tokio::test]
    async fn earlier_emissions_are_not_mutated() {
        let vision = Arc::new(FakeVision::default());
        let snap = snapshot(vec![image(0, false, false), image(1, false, true)], vec![]);
        let updates: Vec<_> = enrich(snap, providers(vision, false), PipelineOptions::default(), None)
            .collect()
            .await;
        assert_eq!(updates[0].snapshot.images[1].ai_description, None);
        assert_eq!(
            updates[1].snapshot.images[1].alt_text,
            "Text in image: text of https://x/1.png"
        );
    }

    #[tokio::test]
    async fn pdfs_follow_images_when_rasterizer_present() {
        let vision = Arc::new(FakeVision::default());
        let pdf = PdfRef {
            id: "pdf-0".into(),
            text: "Policy".into(),
            href: "https://x/p.pdf".into(),
            ai_description: None,
            status: EnrichmentStatus::Pending,
        };
        let snap = snapshot(vec![image(0, false, false)], vec![pdf.clone()]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let updates: Vec<_> = enrich(snap.clone(), providers(vision.clone(), true), PipelineOptions::default(), Some(tx))
            .collect()
            .await;
        assert!(matches!(updates[1].item, WorkItem::Pdf { .. }));
        assert_eq!(updates[1].snapshot.pdfs[0].status, EnrichmentStatus::Complete);

        let mut started = 0;
        let mut finished = false;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                ProgressEvent::Started { position, snapshot, item, .. } => {
                    if let WorkItem::Image { index, .. } = item {
                        assert_eq!(snapshot.images[index].status, EnrichmentStatus::InProgress);
                    }
                    assert_eq!(position, started);
                    started += 1;
                }
                ProgressEvent::Finished { total, failed } => {
                    assert_eq!((total, failed), (2, 0));
                    finished = true;
                }
            }
        }
        assert_eq!(started, 2);
        assert!(finished);

        let without: Vec<_> = enrich(snap, providers(vision, false), PipelineOptions::default(), None)
            .collect()
            .await;
        assert_eq!(without.len(), 1);
    }

    #[tokio::test]
    async fn nothing_runs_until_polled() {
        let vision = Arc::new(FakeVision::default());
        let snap = snapshot(vec![image(0, false, false)], vec![]);
        let stream = enrich(snap, providers(vision.clone(), false), PipelineOptions::default(), None);
        assert!(vision.calls().is_empty());
        drop(stream);
        assert!(vision.calls().is_empty());
    }
}
