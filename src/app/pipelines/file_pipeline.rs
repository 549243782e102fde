use std::path::Path;
use std::sync::Arc;

use crate::app::codec::{self, InputFormat};
use crate::core::countries::CountryTable;
use crate::core::processor::RecordProcessor;
use crate::core::schema::{Schema, DEFAULT_ALLOWED_COUNTRIES};
use crate::core::transforms::SystemClock;
use crate::core::validators::{CountryWhitelist, DateValidator};
use crate::core::{BatchReport, Clock, ConfigProvider, DecodedRecord, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};

/// Reads a CSV/JSON file of transactions, validates every record and writes
/// the accepted records and the rejections side by side.
pub struct FilePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) processor: RecordProcessor,
}

impl<S: Storage, C: ConfigProvider> FilePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, config: C, clock: Arc<dyn Clock>) -> Self {
        let processor = build_processor(&config, clock);
        Self {
            storage,
            config,
            processor,
        }
    }

    pub fn processor(&self) -> &RecordProcessor {
        &self.processor
    }

    async fn write_output(&self, file_name: String, contents: String) -> Result<()> {
        let path = Path::new(self.config.output_path()).join(&file_name);
        let path = path.to_str().ok_or_else(|| EtlError::InvalidConfigValueError {
            field: "output_path".to_string(),
            value: self.config.output_path().to_string(),
            reason: "Output path is not valid UTF-8".to_string(),
        })?;

        tracing::debug!("Writing {} ({} bytes)", path, contents.len());
        self.storage.write_file(path, contents.as_bytes()).await
    }
}

/// Schema, country table and stages as the configuration describes them.
pub fn build_processor<C: ConfigProvider>(config: &C, clock: Arc<dyn Clock>) -> RecordProcessor {
    let whitelist = if config.allowed_countries().is_empty() {
        CountryWhitelist::new(DEFAULT_ALLOWED_COUNTRIES)
    } else {
        CountryWhitelist::new(config.allowed_countries().iter().cloned())
    };

    let dates = if config.date_formats().is_empty() {
        DateValidator::default()
    } else {
        DateValidator::with_formats(config.date_formats().iter().cloned())
    };

    let countries = Arc::new(CountryTable::default().with_aliases(config.country_aliases()));

    RecordProcessor::with_stages(
        Schema::transaction_with(whitelist, dates),
        config.stages(),
        countries,
        clock,
    )
    .with_options(config.validation_options())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for FilePipeline<S, C> {
    async fn extract(&self) -> Result<Vec<DecodedRecord>> {
        let input = self.config.input_path();
        let format = InputFormat::from_path(input)?;

        tracing::debug!("Reading {:?} input from: {}", format, input);
        let data = self.storage.read_file(input).await?;

        let records = format.decode(&data)?;
        if records.is_empty() {
            tracing::warn!("⚠️ No records found in {}", input);
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<DecodedRecord>) -> Result<BatchReport> {
        tracing::debug!(
            "Processing {} records (stages: {})",
            data.len(),
            self.config.stages().as_str()
        );
        Ok(self.processor.process_decoded(data))
    }

    async fn load(&self, report: &BatchReport) -> Result<String> {
        for format in self.config.output_formats() {
            if !report.valid.is_empty() {
                let contents = match format.as_str() {
                    "csv" => codec::records_to_csv(&report.valid)?,
                    "json" => codec::records_to_json(&report.valid)?,
                    other => {
                        return Err(EtlError::InvalidConfigValueError {
                            field: "output_formats".to_string(),
                            value: other.to_string(),
                            reason: "Valid formats: csv, json".to_string(),
                        })
                    }
                };
                let file_name = format!("{}.{}", self.config.valid_file_stem(), format);
                self.write_output(file_name, contents).await?;
            }

            if !report.errors.is_empty() {
                let contents = match format.as_str() {
                    "csv" => codec::errors_to_csv(&report.errors)?,
                    _ => codec::errors_to_json(&report.errors)?,
                };
                let file_name = format!("{}.{}", self.config.errors_file_stem(), format);
                self.write_output(file_name, contents).await?;
            }
        }

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::processor::Stages;
    use crate::core::schema::ValidationOptions;
    use crate::core::transforms::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|data| String::from_utf8_lossy(data).to_string())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        input_path: String,
        output_formats: Vec<String>,
        stages: Stages,
        allowed_countries: Vec<String>,
    }

    impl MockConfig {
        fn new(input_path: &str, stages: Stages) -> Self {
            Self {
                input_path: input_path.to_string(),
                output_formats: vec!["csv".to_string(), "json".to_string()],
                stages,
                allowed_countries: vec![],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            &self.input_path
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn stages(&self) -> Stages {
            self.stages
        }

        fn validation_options(&self) -> ValidationOptions {
            ValidationOptions::default()
        }

        fn allowed_countries(&self) -> &[String] {
            &self.allowed_countries
        }

        fn date_formats(&self) -> &[String] {
            &[]
        }

        fn country_aliases(&self) -> Vec<(String, String)> {
            vec![("Brasil".to_string(), "BR".to_string())]
        }
    }

    const CSV_INPUT: &str = "\
Transaction_ID,Card_ID,Timestamp,Amount,Merchant_City,Merchant_Country,Latitude,Longitude,Device_ID,Channel,Entry_Mode,Auth_Method,Merchant_Category,Transaction_Status
T1,C1,11/20/2025 21:47,120.5,Mumbai,India,19.07,72.87,D1,POS,CHIP,PIN,Grocery,APPROVED
T2,C2,11/20/2025 21:50,0,London,UK,51.5,-0.12,D2,ONLINE,MANUAL,OTP,Travel,DECLINED
T3,C3,2025-11-20,15,Paris,France,48.85,2.35,D3,ATM,CHIP,PIN,Cash,APPROVED
";

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 11, 21, 8, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_extract_reads_csv_records() {
        let storage = MockStorage::default();
        storage.put("tx.csv", CSV_INPUT).await;
        let pipeline = FilePipeline::new(storage, MockConfig::new("tx.csv", Stages::Sanitize));

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.is_success()));
        let third = records[2].as_ref().success().unwrap();
        assert_eq!(third.get_str("Merchant_Country"), Some("France"));
    }

    #[tokio::test]
    async fn test_extract_rejects_unknown_extension() {
        let pipeline = FilePipeline::new(
            MockStorage::default(),
            MockConfig::new("tx.parquet", Stages::Sanitize),
        );
        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::UnsupportedFormatError { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_partitions_batch() {
        let storage = MockStorage::default();
        storage.put("tx.csv", CSV_INPUT).await;
        let pipeline = FilePipeline::with_clock(
            storage,
            MockConfig::new("tx.csv", Stages::Both),
            fixed_clock(),
        );

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();

        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.valid[0].get_str("Channel_Type"), Some("Presencial"));
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[0].error, "Amount failed: Amount must be positive");
        assert_eq!(report.errors[1].row, 2);
        assert!(report.errors[1].error.starts_with("Timestamp failed: Date must match one of"));
    }

    #[tokio::test]
    async fn test_load_writes_valid_and_error_files() {
        let storage = MockStorage::default();
        storage.put("tx.csv", CSV_INPUT).await;
        let pipeline = FilePipeline::with_clock(
            storage.clone(),
            MockConfig::new("tx.csv", Stages::Sanitize),
            fixed_clock(),
        );

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();
        let output = pipeline.load(&report).await.unwrap();
        assert_eq!(output, "out");

        let valid_csv = storage.get_file("out/valid_transactions.csv").await.unwrap();
        assert!(valid_csv.starts_with("Transaction_ID,Card_ID,Timestamp,Amount"));
        assert!(valid_csv.contains("T1,C1,11/20/2025 21:47,120.5,Mumbai,IN"));

        let errors_csv = storage.get_file("out/errors.csv").await.unwrap();
        assert!(errors_csv.starts_with("row,error"));
        assert_eq!(errors_csv.lines().count(), 3);

        let errors_json = storage.get_file("out/errors.json").await.unwrap();
        let errors: serde_json::Value = serde_json::from_str(&errors_json).unwrap();
        assert_eq!(errors[0]["row"], 1);
    }

    #[tokio::test]
    async fn test_load_skips_empty_collections() {
        let storage = MockStorage::default();
        let pipeline = FilePipeline::new(
            storage.clone(),
            MockConfig::new("tx.csv", Stages::Sanitize),
        );

        pipeline.load(&BatchReport::default()).await.unwrap();
        assert!(storage.files.lock().await.is_empty());
    }

    const JSON_TX: &str = r#"{"Transaction_ID": "T1", "Card_ID": "C1", "Timestamp": "11/20/2025 21:47",
        "Amount": 9.5, "Merchant_City": "Mumbai", "Merchant_Country": "India",
        "Latitude": 19.07, "Longitude": 72.87, "Device_ID": "D1", "Channel": "POS",
        "Entry_Mode": "CHIP", "Auth_Method": "PIN", "Merchant_Category": "Food",
        "Transaction_Status": "APPROVED"}"#;

    #[tokio::test]
    async fn test_non_object_json_element_does_not_abort_batch() {
        let storage = MockStorage::default();
        storage
            .put("tx.json", &format!("[{}, 5, {}]", JSON_TX, JSON_TX))
            .await;
        let pipeline = FilePipeline::with_clock(
            storage.clone(),
            MockConfig::new("tx.json", Stages::Sanitize),
            fixed_clock(),
        );

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();

        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[0].error, "Record must be an object, got 5");

        pipeline.load(&report).await.unwrap();
        assert!(storage.get_file("out/valid_transactions.json").await.is_some());
        assert!(storage.get_file("out/errors.json").await.is_some());
    }

    #[tokio::test]
    async fn test_undecodable_csv_row_does_not_abort_batch() {
        let mut input = CSV_INPUT.lines().take(2).collect::<Vec<_>>().join("\n").into_bytes();
        input.extend_from_slice(b"\nT9,C9,11/20/2025 21:47,5,\xff\xfe,India,1,1,D9,POS,CHIP,PIN,Food,APPROVED\n");
        input.extend_from_slice(CSV_INPUT.lines().nth(1).unwrap().as_bytes());
        input.push(b'\n');

        let storage = MockStorage::default();
        storage.files.lock().await.insert("tx.csv".to_string(), input);
        let pipeline = FilePipeline::with_clock(
            storage,
            MockConfig::new("tx.csv", Stages::Sanitize),
            fixed_clock(),
        );

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();

        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[0].error, "Invalid UTF-8 in field Merchant_City");
    }

    #[tokio::test]
    async fn test_configured_aliases_and_allow_list() {
        let storage = MockStorage::default();
        storage
            .put(
                "tx.json",
                r#"[{"Transaction_ID": "T1", "Card_ID": "C1", "Timestamp": "11/20/2025 21:47",
                     "Amount": 9.5, "Merchant_City": "Rio", "Merchant_Country": "Brasil",
                     "Latitude": -22.9, "Longitude": -43.2, "Device_ID": "D1", "Channel": "POS",
                     "Entry_Mode": "CHIP", "Auth_Method": "PIN", "Merchant_Category": "Food",
                     "Transaction_Status": "APPROVED"}]"#,
            )
            .await;

        let mut config = MockConfig::new("tx.json", Stages::Transform);
        config.allowed_countries = vec!["BR".to_string()];
        let pipeline = FilePipeline::with_clock(storage, config, fixed_clock());

        let records = pipeline.extract().await.unwrap();
        let report = pipeline.transform(records).await.unwrap();
        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.valid[0].get_str("Merchant_Country"), Some("BR"));
    }
}
