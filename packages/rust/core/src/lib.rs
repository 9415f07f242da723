//! Core pipeline for EventFeed.
//!
//! Period enumeration, date normalization, deduplication and feed assembly,
//! plus the orchestration that runs them over fetched period pages.

pub mod assembler;
pub mod events;
pub mod normalize;
pub mod periods;
pub mod pipeline;

pub use assembler::{FeedSettings, build_feed, build_summary};
pub use events::EventSet;
pub use normalize::TemporalNormalizer;
pub use periods::enumerate_periods;
pub use pipeline::{
    EventPipeline, FeedArtifacts, PeriodReport, ProgressReporter, RunSummary, SilentProgress,
    assemble_pages, run,
};
