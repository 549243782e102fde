//! Validation and ETL for card transaction records.
//!
//! Records are sanitized, optionally enriched, and checked against a
//! declarative [`Schema`]. A batch run partitions its input into accepted
//! records and per-row errors, see [`FilePipeline`] and [`EtlEngine`].

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use app::pipelines::FilePipeline;
pub use crate::core::etl::EtlEngine;
pub use crate::core::outcome::Outcome;
pub use crate::core::processor::{RecordProcessor, Stages};
pub use crate::core::schema::{Schema, ValidationFailure, ValidationOptions, ValidationPolicy};
pub use domain::model::{BatchReport, Record, RecordError, RunSummary};
pub use utils::error::{EtlError, Result};
