pub mod error;
pub mod event;
pub mod script;
pub mod traits;
pub mod types;

pub use error::PageSightError;
pub use event::{ControllerEvent, NoticeKind, SpeechEvent, SpeechId};
pub use script::PageScript;
pub use traits::{
    CaptionProvider, DocumentRasterizer, OcrProvider, PageTransport, QuestionAnswerer,
    RemoteExecutor, SpeechOutput, Summarizer, TargetResolver,
};
pub use types::{
    AccessibilityPolicy, Dimensions, EnrichedSnapshot, EnrichmentStatus, Heading, ImageRecord,
    ImageSource, LinkRef, PageHandle, PageSnapshot, PageTarget, PdfRef, SessionId,
    DESCRIPTION_UNAVAILABLE, MAX_LINKS, MAX_MAIN_TEXT_BLOCKS,
};
