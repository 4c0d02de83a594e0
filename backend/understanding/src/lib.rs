//! Enrichment providers backed by hosted models.
//!
//! Every client here implements one or more of the collaborator traits from
//! `pagesight-core`, so the pipeline and controller never see HTTP.

pub mod fetch;
pub mod huggingface;
pub mod ocr;
pub mod vision;

pub use fetch::{load_image, to_data_url};
pub use huggingface::{HuggingFaceClient, HuggingFaceModels};
pub use ocr::{clean_ocr_output, OCR_PROMPT};
pub use vision::{describe_image, VisionClient, VisionProvider, CAPTION_PROMPT};
