pub mod countries;
pub mod etl;
pub mod outcome;
pub mod parser;
pub mod processor;
pub mod sanitizers;
pub mod schema;
pub mod transforms;
pub mod validators;

pub use crate::domain::model::{BatchReport, DecodedRecord, Record, RecordError, RunSummary};
pub use crate::domain::ports::{Clock, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
