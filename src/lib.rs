//! # watchlog
//!
//! A small personal media-tracking service: series records live in an
//! embedded key-value bucket, and an HTTP surface lists, upserts,
//! bulk-replaces and attaches cover images to them.
//!
//! ## Core Concepts
//!
//! - **Series**: a tracked media item keyed by its external identifier
//! - **Bucket**: a named, file-backed key-value bucket with one write
//!   transaction at a time and snapshot reads
//! - **Tracker**: the query/mutation service enforcing validation,
//!   timestamping and the bulk-replace contract
//!
//! ## Example
//!
//! ```ignore
//! use watchlog::{Series, Tracker, TrackerConfig};
//!
//! let tracker = Tracker::open(&TrackerConfig::default())?;
//!
//! let series = Series {
//!     external_id: "tt0903747".into(),
//!     title: "Breaking Bad".into(),
//!     ..Default::default()
//! };
//! let all = tracker.upsert(series)?;
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod http;
pub mod images;
pub mod tracker;
pub mod types;

// Re-exports
pub use bucket::Bucket;
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use http::{router, AppState};
pub use images::{store_cover, CoverUpload};
pub use tracker::{Scan, Tracker, SERIES_BUCKET};
pub use types::{Series, Timestamp};
