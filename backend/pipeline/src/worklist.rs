use pagesight_core::PageSnapshot;
use serde::Serialize;

/// One unit of enrichment work, pointing back into the snapshot by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkItem {
    Image { index: usize, id: String, src: String, ocr: bool },
    Pdf { index: usize, id: String, href: String },
}

impl WorkItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Image { id, .. } | Self::Pdf { id, .. } => id,
        }
    }
}

/// Images lacking an accessible description, then PDFs when `include_pdfs` is set.
pub fn build_worklist(snapshot: &PageSnapshot, include_pdfs: bool) -> Vec<WorkItem> {
    let images = snapshot
        .images
        .iter()
        .enumerate()
        .filter(|(_, img)| !img.is_accessible)
        .map(|(index, img)| WorkItem::Image {
            index,
            id: img.id.clone(),
            src: img.src.clone(),
            ocr: img.is_ocr_candidate,
        });

    let pdfs = snapshot
        .pdfs
        .iter()
        .enumerate()
        .filter(|_| include_pdfs)
        .map(|(index, pdf)| WorkItem::Pdf { index, id: pdf.id.clone(), href: pdf.href.clone() });

    images.chain(pdfs).collect()
}
