//! Shared types, error model, and configuration for EventFeed.
//!
//! This crate is the foundation depended on by all other EventFeed crates.
//! It provides:
//! - [`EventFeedError`]: the unified error type
//! - Domain types ([`Period`], [`RawEventFields`], [`EventTimestamp`], [`CanonicalEvent`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FeedConfig, FetchConfig, FetchSettings, OutputConfig, SourceConfig,
    UnknownDatePolicy, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{EventFeedError, Result};
pub use types::{
    CanonicalEvent, DateSource, EventTimestamp, LinkSource, Period, RawEventFields,
};
