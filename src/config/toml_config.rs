use crate::config::{INPUT_EXTENSIONS, OUTPUT_FORMATS};
use crate::core::processor::Stages;
use crate::core::schema::{RecordOutput, ValidationOptions, ValidationPolicy};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    /// Extra country aliases, name → ISO code.
    #[serde(default)]
    pub countries: BTreeMap<String, String>,
    pub load: LoadConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub stages: Stages,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub policy: ValidationPolicy,
    #[serde(default)]
    pub output: RecordOutput,
    #[serde(default)]
    pub allowed_countries: Vec<String>,
    #[serde(default)]
    pub date_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filenames: Option<FilenameConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameConfig {
    pub valid: Option<String>,
    pub errors: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    pub verbose: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INPUT_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 路徑中仍留有 `${VAR}` 代表環境變數未設定
    fn require_resolved(field: &str, value: &str) -> Result<()> {
        match ENV_VAR_PATTERN.captures(value) {
            Some(caps) => Err(EtlError::MissingConfigError {
                field: format!("{} (environment variable {} is not set)", field, &caps[1]),
            }),
            None => Ok(()),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        Self::require_resolved("input.path", &self.input.path)?;
        Self::require_resolved("load.output_path", &self.load.output_path)?;

        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_file_extensions(
            "input.path",
            std::slice::from_ref(&self.input.path),
            &INPUT_EXTENSIONS,
        )?;

        validation::validate_path("load.output_path", &self.load.output_path)?;

        if self.load.output_formats.is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: "load.output_formats".to_string(),
                message: "At least one output format is required".to_string(),
            });
        }
        for format in &self.load.output_formats {
            validation::validate_one_of("load.output_formats", format, &OUTPUT_FORMATS)?;
        }

        validation::validate_country_codes(
            "schema.allowed_countries",
            &self.schema.allowed_countries,
        )?;
        for format in &self.schema.date_formats {
            validation::validate_non_empty_string("schema.date_formats", format)?;
        }

        for (alias, code) in &self.countries {
            validation::validate_non_empty_string("countries", alias)?;
            validation::validate_country_codes("countries", std::slice::from_ref(code))?;
        }

        if let Some(filenames) = &self.load.filenames {
            if let Some(valid) = &filenames.valid {
                validation::validate_non_empty_string("load.filenames.valid", valid)?;
            }
            if let Some(errors) = &filenames.errors {
                validation::validate_non_empty_string("load.filenames.errors", errors)?;
            }
        }

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn stages(&self) -> Stages {
        self.process.stages
    }

    fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            policy: self.schema.policy,
            output: self.schema.output,
        }
    }

    fn allowed_countries(&self) -> &[String] {
        &self.schema.allowed_countries
    }

    fn date_formats(&self) -> &[String] {
        &self.schema.date_formats
    }

    fn country_aliases(&self) -> Vec<(String, String)> {
        self.countries
            .iter()
            .map(|(alias, code)| (alias.clone(), code.clone()))
            .collect()
    }

    fn valid_file_stem(&self) -> &str {
        self.load
            .filenames
            .as_ref()
            .and_then(|f| f.valid.as_deref())
            .unwrap_or("valid_transactions")
    }

    fn errors_file_stem(&self) -> &str {
        self.load
            .filenames
            .as_ref()
            .and_then(|f| f.errors.as_deref())
            .unwrap_or("errors")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
