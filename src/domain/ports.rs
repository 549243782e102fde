use crate::core::processor::Stages;
use crate::core::schema::ValidationOptions;
use crate::domain::model::{BatchReport, DecodedRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn stages(&self) -> Stages;
    fn validation_options(&self) -> ValidationOptions;
    /// Empty means the default transaction allow-list.
    fn allowed_countries(&self) -> &[String];
    /// Empty means the default date formats.
    fn date_formats(&self) -> &[String];
    /// Extra alias → code pairs layered over the built-in country table.
    fn country_aliases(&self) -> Vec<(String, String)>;
    fn valid_file_stem(&self) -> &str {
        "valid_transactions"
    }
    fn errors_file_stem(&self) -> &str {
        "errors"
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<DecodedRecord>>;
    async fn transform(&self, data: Vec<DecodedRecord>) -> Result<BatchReport>;
    async fn load(&self, report: &BatchReport) -> Result<String>;
}

/// Source of "now" for enrichment steps that stamp records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
