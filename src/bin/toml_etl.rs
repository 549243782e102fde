use anyhow::Context;
use clap::Parser;
use txn_etl::config::toml_config::TomlConfig;
use txn_etl::core::ConfigProvider;
use txn_etl::utils::error::ErrorSeverity;
use txn_etl::utils::{logger, validation::Validate};
use txn_etl::{EtlEngine, FilePipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Transaction ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let verbose = args.verbose || config.verbose();
    if config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting TOML-based transaction ETL");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config)
            .await
            .with_context(|| format!("Dry run failed for '{}'", config.input_path()))?;
        return Ok(());
    }

    let storage = LocalStorage::default();
    let pipeline = FilePipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!(
                "📊 {} records: {} valid, {} invalid",
                summary.total, summary.valid, summary.invalid
            );
            for (error, count) in &summary.error_counts {
                println!("  {:>5}  {}", count, error);
            }
            println!("📁 Output saved to: {}", summary.output_path);
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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Stages: {}", config.stages().as_str());
    println!("  Policy: {:?}", config.validation_options().policy);
    println!("  Formats: {}", config.output_formats().join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

/// 讀取輸入並驗證，但不寫出任何檔案
async fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    use txn_etl::core::Pipeline;

    println!("🔍 Dry Run Analysis:");
    println!();

    let pipeline = FilePipeline::new(LocalStorage::default(), config.clone());
    let records = pipeline
        .extract()
        .await
        .context("Could not read input records")?;
    let report = pipeline
        .transform(records)
        .await
        .context("Could not validate input records")?;

    println!("⚙️ Processing:");
    println!("  Schema fields: {}", pipeline.processor().schema().len());
    println!("  Records read: {}", report.total());
    println!("  Would accept: {}", report.valid.len());
    println!("  Would reject: {}", report.errors.len());

    if !report.errors.is_empty() {
        println!();
        println!("🧾 Error types:");
        for (error, count) in report.error_counts() {
            println!("  {:>5}  {}", count, error);
        }
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    for format in config.output_formats() {
        println!("  {}.{}", config.valid_file_stem(), format);
        println!("  {}.{}", config.errors_file_stem(), format);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
