//! Interpretation pipeline: turns a scanned snapshot into a lazily enriched one.
//!
//! Items are processed strictly one after another, in snapshot order. Every
//! item yields exactly one [`EnrichmentUpdate`]; a provider failure writes the
//! sentinel description and the run moves on.

pub mod enricher;
pub mod worklist;

pub use enricher::{
    enrich, synthesize_alt_text, EnrichmentProviders, EnrichmentUpdate, ItemOutcome, PipelineOptions,
    ProgressEvent, NO_TEXT_FOUND,
};
pub use worklist::{build_worklist, WorkItem};
