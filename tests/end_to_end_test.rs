use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use txn_etl::config::toml_config::TomlConfig;
use txn_etl::core::transforms::FixedClock;
use txn_etl::{
    CliConfig, EtlEngine, EtlError, FilePipeline, LocalStorage, Stages, ValidationPolicy,
};

const HEADER: &str = "Transaction_ID,Card_ID,Timestamp,Amount,Merchant_City,Merchant_Country,Latitude,Longitude,Device_ID,Channel,Entry_Mode,Auth_Method,Merchant_Category,Transaction_Status";

fn write_input(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

fn cli_config(input: String, output_path: String) -> CliConfig {
    CliConfig {
        input,
        output_path,
        stages: Stages::Sanitize,
        policy: ValidationPolicy::FailFast,
        emit_coerced: false,
        formats: vec!["csv".to_string(), "json".to_string()],
        allowed_countries: vec![],
        verbose: false,
        log_json: false,
    }
}

fn sample_csv() -> String {
    [
        HEADER,
        "T-1,C-1,11/20/2025 21:47,42.50,  Mexico City ,Mexico,19.43,-99.13,D-1,web,CHIP,PIN,Groceries,APPROVED",
        "T-2,C-2,11/20/2025 21:50,-5,Toronto,Canada,43.65,-79.38,D-2,pos,SWIPE,SIGNATURE,Fuel,DECLINED",
        "T-3,C-3,11/21/2025 08:15,120,Berlin,Deutschland,52.52,13.40,D-3,atm,CHIP,PIN,Cash,APPROVED",
        "T-4,C-4,11/21/2025 09:00,15",
    ]
    .join("\n")
}

#[tokio::test]
async fn test_end_to_end_csv_batch() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(temp_dir.path(), "transactions.csv", &sample_csv());
    let output_path = temp_dir.path().join("out").to_str().unwrap().to_string();

    let pipeline = FilePipeline::new(LocalStorage::default(), cli_config(input, output_path.clone()));
    let engine = EtlEngine::new(pipeline);
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.valid, 1);
    assert_eq!(summary.invalid, 3);
    assert_eq!(summary.output_path, output_path);

    let valid_csv = std::fs::read_to_string(Path::new(&output_path).join("valid_transactions.csv")).unwrap();
    assert!(valid_csv.starts_with("Transaction_ID,Card_ID"));
    assert!(valid_csv.contains("T-1"));
    assert!(valid_csv.contains(",Mexico City,MX,"));
    assert!(!valid_csv.contains("T-2"));

    let errors_csv = std::fs::read_to_string(Path::new(&output_path).join("errors.csv")).unwrap();
    assert!(errors_csv.starts_with("row,error"));
    assert!(errors_csv.contains("1,Amount failed: Amount must be positive"));
    assert!(errors_csv.contains("Country DE not allowed"));
    assert!(errors_csv.contains("Missing fields: ["));

    let errors_json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(Path::new(&output_path).join("errors.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(errors_json.as_array().unwrap().len(), 3);
    assert_eq!(errors_json[0]["row"], 1);
}

#[tokio::test]
async fn test_end_to_end_json_with_transform_stage() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(
        temp_dir.path(),
        "transactions.json",
        r#"[
            {"Transaction_ID": "T-9", "Card_ID": "C-1", "Timestamp": "20/11/2025 21:47",
             "Amount": 99.9, "Merchant_City": "Dubai", "Merchant_Country": "UAE",
             "Latitude": 25.2, "Longitude": 55.27, "Device_ID": "D-2", "Channel": "atm",
             "Entry_Mode": "CHIP", "Auth_Method": "PIN", "Merchant_Category": "Cash",
             "Transaction_Status": "APPROVED"}
        ]"#,
    );
    let output_path = temp_dir.path().join("out").to_str().unwrap().to_string();

    let mut config = cli_config(input, output_path.clone());
    config.stages = Stages::Transform;
    config.formats = vec!["json".to_string()];

    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 11, 22, 10, 0, 0).unwrap()));
    let pipeline = FilePipeline::with_clock(LocalStorage::default(), config, clock);
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.valid, 1);
    assert_eq!(summary.invalid, 0);
    assert!(!Path::new(&output_path).join("errors.json").exists());

    let valid: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(Path::new(&output_path).join("valid_transactions.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(valid[0]["Merchant_Country"], "AE");
    assert_eq!(valid[0]["Channel_Type"], "Cajero");
    assert!(valid[0]["Processed_At"].as_str().unwrap().starts_with("2025-11-22T10:00:00"));
}

#[tokio::test]
async fn test_toml_config_drives_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(temp_dir.path(), "batch.csv", &sample_csv());
    let output_path = temp_dir.path().join("report").to_str().unwrap().to_string();

    let toml_content = format!(
        r#"
[pipeline]
name = "berlin"
description = "Allow DE"
version = "1.0"

[input]
path = "{input}"

[schema]
policy = "collect-all"
allowed_countries = ["DE", "MX", "CA"]

[load]
output_path = "{output_path}"
output_formats = ["csv"]

[load.filenames]
valid = "accepted"
errors = "rejected"
"#
    );
    let config = TomlConfig::from_toml_str(&toml_content).unwrap();

    let summary = EtlEngine::new(FilePipeline::new(LocalStorage::default(), config))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.valid, 2);
    assert_eq!(summary.invalid, 2);
    assert!(Path::new(&output_path).join("accepted.csv").exists());
    assert!(Path::new(&output_path).join("rejected.csv").exists());
}

#[tokio::test]
async fn test_missing_input_file_fails_run() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("nope.csv").to_str().unwrap().to_string();
    let output_path = temp_dir.path().join("out").to_str().unwrap().to_string();

    let engine = EtlEngine::new(FilePipeline::new(
        LocalStorage::default(),
        cli_config(input, output_path),
    ));

    assert!(matches!(engine.run().await, Err(EtlError::IoError(_))));
}
