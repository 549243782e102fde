pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::processor::Stages;
#[cfg(feature = "cli")]
use crate::core::schema::{RecordOutput, ValidationOptions, ValidationPolicy};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];
pub const INPUT_EXTENSIONS: [&str; 2] = ["csv", "json"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "txn-etl")]
#[command(about = "Sanitize, enrich and validate card transactions from CSV/JSON files")]
pub struct CliConfig {
    #[arg(long, help = "Input file (.csv or .json)")]
    pub input: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_enum, default_value_t = Stages::Sanitize)]
    pub stages: Stages,

    #[arg(long, value_enum, default_value_t = ValidationPolicy::FailFast)]
    pub policy: ValidationPolicy,

    #[arg(long, help = "Return validator-coerced values in accepted records")]
    pub emit_coerced: bool,

    #[arg(long, value_delimiter = ',', default_value = "csv")]
    pub formats: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Override the country allow-list")]
    pub allowed_countries: Vec<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn stages(&self) -> Stages {
        self.stages
    }

    fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            policy: self.policy,
            output: if self.emit_coerced {
                RecordOutput::Coerced
            } else {
                RecordOutput::Original
            },
        }
    }

    fn allowed_countries(&self) -> &[String] {
        &self.allowed_countries
    }

    fn date_formats(&self) -> &[String] {
        &[]
    }

    fn country_aliases(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_file_extensions(
            "input",
            std::slice::from_ref(&self.input),
            &INPUT_EXTENSIONS,
        )?;
        validation::validate_path("output_path", &self.output_path)?;
        for format in &self.formats {
            validation::validate_one_of("formats", format, &OUTPUT_FORMATS)?;
        }
        validation::validate_country_codes("allowed_countries", &self.allowed_countries)?;
        Ok(())
    }
}
