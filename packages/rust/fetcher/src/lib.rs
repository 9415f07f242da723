//! Page acquisition for EventFeed: everything that touches the network or
//! the snapshot directory.
//!
//! This crate provides:
//! - [`period_url`]: the calendar URL queried for one period
//! - [`Fetcher`]: concurrent, polite HTTP fetch driver returning pages in period order
//! - [`load_snapshot_dir`]: replay of pages dumped by an earlier run

pub mod engine;
pub mod replay;
pub mod request;

pub use engine::{FetchOutcome, Fetcher, PeriodPage};
pub use replay::{load_snapshot_dir, snapshot_file_name};
pub use request::period_url;
