use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum number of main-text blocks kept in a snapshot.
pub const MAX_MAIN_TEXT_BLOCKS: usize = 10;

/// Maximum number of links kept in a snapshot.
pub const MAX_LINKS: usize = 15;

/// Sentinel written into `ai_description` when a provider call fails.
pub const DESCRIPTION_UNAVAILABLE: &str = "Description unavailable";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies one scan session. Async results carry it so stale ones can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a page in the host (a CDP target id for the bundled bridge).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageHandle(String);

impl PageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The page the controller is currently pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    pub handle: PageHandle,
    pub url: String,
    pub title: String,
}

impl PageTarget {
    /// True when the target itself is a PDF document rather than an HTML page.
    pub fn is_document(&self) -> bool {
        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        path.ends_with(".pdf")
    }
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 for `<h1>` through 6 for `<h6>`.
    #[serde(deserialize_with = "heading_level")]
    pub level: u8,
    pub text: String,
}

/// Accepts either a number or a tag name such as `"H2"`.
fn heading_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Level {
        Number(u8),
        Tag(String),
    }

    match Level::deserialize(deserializer)? {
        Level::Number(n) => Ok(n),
        Level::Tag(tag) => tag
            .trim_start_matches(['h', 'H'])
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid heading level: {tag}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Where an item stands in the enrichment pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
    /// Accessible items are never sent to a provider.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub src: String,
    #[serde(default, alias = "alt")]
    pub alt_text: String,
    #[serde(default)]
    pub is_accessible: bool,
    #[serde(default, rename = "isOCRCandidate")]
    pub is_ocr_candidate: bool,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
    #[serde(default)]
    pub status: EnrichmentStatus,
}

impl ImageRecord {
    /// The description a listener should hear, if any exists.
    pub fn spoken_description(&self) -> Option<&str> {
        if self.is_accessible {
            return Some(self.alt_text.as_str());
        }
        match self.ai_description.as_deref() {
            Some(d) if d != DESCRIPTION_UNAVAILABLE && !d.trim().is_empty() => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRef {
    pub id: String,
    pub text: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
    #[serde(default)]
    pub status: EnrichmentStatus,
}

/// Decides whether an alt text is long enough to count as human-authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityPolicy {
    pub min_alt_text_len: usize,
}

impl Default for AccessibilityPolicy {
    fn default() -> Self {
        Self { min_alt_text_len: 5 }
    }
}

impl AccessibilityPolicy {
    pub fn is_accessible(&self, alt_text: &str) -> bool {
        let len = alt_text.trim().chars().count();
        len > 0 && len >= self.min_alt_text_len
    }
}

/// Structured extraction of a page's accessibility-relevant content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub headings: Vec<Heading>,
    #[serde(default)]
    pub main_text: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub links: Vec<LinkRef>,
    #[serde(default)]
    pub pdfs: Vec<PdfRef>,
}

impl PageSnapshot {
    /// Apply the scanner limits and re-derive accessibility under `policy`.
    pub fn normalize(mut self, policy: &AccessibilityPolicy) -> Self {
        self.main_text.retain(|block| !block.trim().is_empty());
        self.main_text.truncate(MAX_MAIN_TEXT_BLOCKS);
        self.links.truncate(MAX_LINKS);
        self.images.retain(|img| img.src.starts_with("http"));
        for img in &mut self.images {
            img.is_accessible = policy.is_accessible(&img.alt_text);
            img.ai_description = None;
            img.status = if img.is_accessible {
                EnrichmentStatus::Skipped
            } else {
                EnrichmentStatus::Pending
            };
        }
        for pdf in &mut self.pdfs {
            pdf.ai_description = None;
            pdf.status = EnrichmentStatus::Pending;
        }
        self
    }

    /// Build the one-item snapshot used when the target is itself a PDF.
    pub fn from_document(target: &PageTarget, extracted: &str, status: EnrichmentStatus) -> Self {
        let title = if target.title.trim().is_empty() {
            "PDF document".to_string()
        } else {
            target.title.clone()
        };
        let main_text = if extracted.trim().is_empty() {
            Vec::new()
        } else {
            vec![extracted.trim().to_string()]
        };
        Self {
            title: title.clone(),
            url: target.url.clone(),
            timestamp: Utc::now(),
            headings: Vec::new(),
            main_text,
            images: Vec::new(),
            links: Vec::new(),
            pdfs: vec![PdfRef {
                id: "pdf-0".to_string(),
                text: title,
                href: target.url.clone(),
                ai_description: Some(extracted.to_string()),
                status,
            }],
        }
    }

    /// All main-text blocks joined into one context string.
    pub fn joined_text(&self) -> String {
        self.main_text.join("\n\n")
    }

    /// Count of images that still need a machine description.
    pub fn undescribed_images(&self) -> usize {
        self.images.iter().filter(|img| !img.is_accessible).count()
    }
}

// ---------------------------------------------------------------------------
// Enriched snapshot
// ---------------------------------------------------------------------------

/// A snapshot at some point of its enrichment. Cloning is cheap, and writers
/// copy on write, so a clone held by a reader never changes underneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSnapshot(Arc<PageSnapshot>);

impl EnrichedSnapshot {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self(Arc::new(snapshot))
    }

    /// Mutable access, cloning the underlying snapshot if anyone else holds it.
    pub fn make_mut(&mut self) -> &mut PageSnapshot {
        Arc::make_mut(&mut self.0)
    }

    pub fn image_count(&self) -> usize {
        self.0.images.len()
    }
}

impl Deref for EnrichedSnapshot {
    type Target = PageSnapshot;

    fn deref(&self) -> &PageSnapshot {
        &self.0
    }
}

impl From<PageSnapshot> for EnrichedSnapshot {
    fn from(snapshot: PageSnapshot) -> Self {
        Self::new(snapshot)
    }
}

impl Serialize for EnrichedSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Provider input
// ---------------------------------------------------------------------------

/// What gets handed to a caption or OCR provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Bytes { data: Bytes, mime_type: String },
}

impl ImageSource {
    pub fn png(data: impl Into<Bytes>) -> Self {
        Self::Bytes { data: data.into(), mime_type: "image/png".to_string() }
    }

    /// Short form for log lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Bytes { data, mime_type } => format!("<{} bytes {}>", data.len(), mime_type),
        }
    }
}
