use clap::Parser;
use txn_etl::utils::error::ErrorSeverity;
use txn_etl::utils::{logger, validation::Validate};
use txn_etl::{CliConfig, EtlEngine, FilePipeline, LocalStorage, RunSummary};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting txn-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 輸入與輸出路徑都相對於目前目錄
    let storage = LocalStorage::default();
    let pipeline = FilePipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            print_summary(&summary);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("✅ ETL process completed successfully!");
    println!("📊 Total records: {}", summary.total);
    println!("  ✔ Valid: {}", summary.valid);
    println!("  ✘ Invalid: {}", summary.invalid);

    if !summary.error_counts.is_empty() {
        println!("🧾 Error types:");
        for (error, count) in &summary.error_counts {
            println!("  {:>5}  {}", count, error);
        }
    }

    println!("📁 Output saved to: {}", summary.output_path);
}
