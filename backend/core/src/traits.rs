//! Collaborator seams. Everything the engine talks to outside its own process
//! state is injected through one of these traits.

use anyhow::Result;
use async_trait::async_trait;

use crate::event::SpeechId;
use crate::script::PageScript;
use crate::types::{ImageSource, PageHandle, PageSnapshot, PageTarget};

/// Finds the page the user is looking at.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn active_page(&self) -> Result<Option<PageTarget>>;
}

/// Request/response channel to the page scanner.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// `Ok(None)` means no scanner answered on the page.
    async fn request_snapshot(&self, page: &PageHandle) -> Result<Option<PageSnapshot>>;

    /// Load the scanner program into a page that lacks it.
    async fn inject_scanner(&self, page: &PageHandle) -> Result<()>;
}

/// Runs a page-side function for its side effects. There is no return channel.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, page: &PageHandle, script: &PageScript) -> Result<()>;
}

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn caption(&self, image: &ImageSource) -> Result<String>;
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn ocr(&self, image: &ImageSource) -> Result<String>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}

/// Renders the first page of a document to an image suitable for OCR.
#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    async fn rasterize(&self, href: &str) -> Result<ImageSource>;
}

/// Text-to-speech output. `speak` interrupts whatever is currently playing.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Start speaking; the returned id is echoed in the matching
    /// [`SpeechEvent::Finished`](crate::event::SpeechEvent::Finished).
    async fn speak(&self, text: &str, rate: f32) -> Result<SpeechId>;

    async fn stop(&self) -> Result<()>;
}
