//! AAT Extract - onset and response-time extraction for Approach-Avoidance Task logs
//!
//! AAT Extract turns raw AAT log files into per-condition time series through a
//! deterministic pipeline: column resolution → trial classification →
//! baseline normalization → category bucketing → export.
//!
//! ## Modules
//!
//! - **Core**: `columns`, `classifier` and `pipeline` classify every trial by
//!   valence, congruency and rotation phase, and normalize its onset against
//!   the file's MRI trigger offset
//! - **I/O**: `reader`, `export` and `display` parse logs, write semicolon
//!   separated exports and render console tables
//! - **Batch**: `config` and `batch` run the extraction over a directory

pub mod batch;
pub mod classifier;
pub mod columns;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod reader;
pub mod types;

pub use batch::{BatchReport, BatchRunner};
pub use columns::{ColumnIndexMap, ColumnLabel, StaticColumn};
pub use config::Config;
pub use error::ExtractError;
pub use pipeline::{analyze, Baseline, Extractor};
pub use types::{Category, Congruency, ResultTable, SeriesValue, TrialProperties, Valence};

/// AAT Extract version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in reports
pub const PRODUCER_NAME: &str = "aat-extract";
