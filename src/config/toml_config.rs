use crate::adapters::input::SUPPORTED_EXTENSIONS;
use crate::core::ConfigProvider;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_open_unit, validate_path,
    validate_positive_number, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

const VALID_FORMATS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportSection,
    pub test_set: TestSetSection,
    pub calibration: CalibrationSection,
    pub output: OutputSection,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub name: String,
    pub description: Option<String>,
    pub alpha: Option<f64>,
    pub budget: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSetSection {
    pub path: String,
    pub judge_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSection {
    pub path: String,
    pub human_column: Option<String>,
    pub judge_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub path: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_DIR}); unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn report_name(&self) -> &str {
        &self.report.name
    }

    fn test_set_path(&self) -> &str {
        &self.test_set.path
    }

    fn calibration_path(&self) -> &str {
        &self.calibration.path
    }

    fn judge_column(&self) -> &str {
        self.test_set.judge_column.as_deref().unwrap_or("judge")
    }

    fn human_column(&self) -> &str {
        self.calibration.human_column.as_deref().unwrap_or("human")
    }

    fn calibration_judge_column(&self) -> &str {
        self.calibration.judge_column.as_deref().unwrap_or("judge")
    }

    fn alpha(&self) -> f64 {
        self.report.alpha.unwrap_or(0.05)
    }

    fn budget(&self) -> Option<u64> {
        self.report.budget
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("report.name", &self.report.name)?;
        validate_open_unit("report.alpha", self.alpha())?;
        if let Some(budget) = self.report.budget {
            validate_positive_number("report.budget", budget, 1)?;
        }

        validate_path("test_set.path", &self.test_set.path)?;
        validate_path("calibration.path", &self.calibration.path)?;
        validate_file_extensions(
            "inputs",
            &[self.test_set.path.clone(), self.calibration.path.clone()],
            SUPPORTED_EXTENSIONS,
        )?;
        validate_path("output.path", &self.output.path)?;

        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "monitoring.log_level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", LOG_LEVELS.join(", ")),
                });
            }
        }

        if self.output.formats.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "output.formats".to_string(),
            });
        }
        for format in &self.output.formats {
            if !VALID_FORMATS.contains(&format.as_str()) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[report]
name = "mt-bench judge audit"
alpha = 0.1
budget = 400

[test_set]
path = "data/judged.csv"

[calibration]
path = "data/calibration.jsonl"
human_column = "label"

[output]
path = "./reports"
formats = ["json", "csv"]
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.report_name(), "mt-bench judge audit");
        assert_eq!(config.alpha(), 0.1);
        assert_eq!(config.budget(), Some(400));
        assert_eq!(config.judge_column(), "judge");
        assert_eq!(config.human_column(), "label");
        assert_eq!(config.calibration_judge_column(), "judge");
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("JUDGE_REPORT_TEST_DIR", "/tmp/judge-data");

        let toml_content = r#"
[report]
name = "env"

[test_set]
path = "${JUDGE_REPORT_TEST_DIR}/test.csv"

[calibration]
path = "${JUDGE_REPORT_UNSET_VAR}/cal.csv"

[output]
path = "./out"
formats = ["json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.test_set.path, "/tmp/judge-data/test.csv");
        assert_eq!(config.calibration.path, "${JUDGE_REPORT_UNSET_VAR}/cal.csv");

        std::env::remove_var("JUDGE_REPORT_TEST_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_alpha = BASIC.replace("alpha = 0.1", "alpha = 1.5");
        let config = TomlConfig::from_toml_str(&bad_alpha).unwrap();
        assert!(config.validate().is_err());

        let bad_format = BASIC.replace(r#"["json", "csv"]"#, r#"["xml"]"#);
        let config = TomlConfig::from_toml_str(&bad_format).unwrap();
        assert!(config.validate().is_err());

        let bad_input = BASIC.replace("data/judged.csv", "data/judged.xlsx");
        let config = TomlConfig::from_toml_str(&bad_input).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = TomlConfig::from_toml_str("[report]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, ReportError::TomlParseError(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_path(), "./reports");
    }

    #[test]
    fn test_monitoring_log_level_is_checked() {
        let with_level = format!("{}\n[monitoring]\nenabled = true\nlog_level = \"DEBUG\"\n", BASIC);
        let config = TomlConfig::from_toml_str(&with_level).unwrap();
        assert_eq!(config.log_level(), Some("DEBUG"));
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());

        let bad_level = format!("{}\n[monitoring]\nlog_level = \"loud\"\n", BASIC);
        let config = TomlConfig::from_toml_str(&bad_level).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ReportError::InvalidConfigValueError { ref field, .. }) if field == "monitoring.log_level"
        ));
    }
}
