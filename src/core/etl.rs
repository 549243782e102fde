use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        tracing::info!("📥 Extracting records...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} records", raw_data.len());

        // Transform
        tracing::info!("🛠️ Sanitizing, transforming and validating...");
        let report = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🛠️ {} valid, {} invalid",
            report.valid.len(),
            report.errors.len()
        );

        // Load
        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("💾 Output saved to: {}", output_path);

        Ok(RunSummary {
            total: report.total(),
            valid: report.valid.len(),
            invalid: report.errors.len(),
            error_counts: report.error_counts(),
            output_path,
        })
    }
}
