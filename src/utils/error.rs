use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgumentError { name: String, reason: String },

    #[error("Invalid input in {source_name} (row {row}): {message}")]
    InvalidInputError {
        source_name: String,
        row: usize,
        message: String,
    },

    #[error("Judge is uninformative (q0={q0}, q1={q1}): q0 + q1 - 1 is zero")]
    DegenerateJudgeError { q0: f64, q1: f64 },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Statistics,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        ReportError::InvalidArgumentError {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(source_name: &str, row: usize, message: impl Into<String>) -> Self {
        ReportError::InvalidInputError {
            source_name: source_name.to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ConfigError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::TomlParseError(_) => ErrorCategory::Configuration,
            ReportError::CsvError(_)
            | ReportError::SerializationError(_)
            | ReportError::InvalidInputError { .. } => ErrorCategory::Input,
            ReportError::InvalidArgumentError { .. }
            | ReportError::DegenerateJudgeError { .. }
            | ReportError::ProcessingError { .. } => ErrorCategory::Statistics,
            ReportError::IoError(_) | ReportError::TaskJoinError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 資料不足以估計，換一批校準資料即可
            ReportError::DegenerateJudgeError { .. } => ErrorSeverity::Medium,
            ReportError::IoError(_) | ReportError::TaskJoinError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReportError::IoError(_) => {
                "Check that the file exists, that the path is spelled correctly and that you have permission to read or write it".to_string()
            }
            ReportError::CsvError(_) => {
                "Make sure the file is valid CSV/TSV with a header row".to_string()
            }
            ReportError::SerializationError(_) => {
                "Make sure JSON input is an array of objects (.json) or one object per line (.jsonl)".to_string()
            }
            ReportError::TomlParseError(_) => {
                "Check the TOML syntax of the configuration file".to_string()
            }
            ReportError::TaskJoinError(_) => {
                "Re-run with --verbose; reduce --workers if the machine is under memory pressure".to_string()
            }
            ReportError::ConfigError { .. } | ReportError::MissingConfigError { .. } => {
                "Review the configuration file or command line flags".to_string()
            }
            ReportError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            ReportError::InvalidArgumentError { name, .. } => {
                format!("Pass a valid value for '{}'", name)
            }
            ReportError::InvalidInputError { source_name, row, .. } => {
                format!("Fix row {} of {} or select the right column", row, source_name)
            }
            ReportError::DegenerateJudgeError { .. } => {
                "The judge agrees with human labels no better than chance; collect more calibration samples or use a different judge".to_string()
            }
            ReportError::ProcessingError { .. } => {
                "Re-run with --verbose to see which step failed".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReportError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "File not found".to_string()
            }
            ReportError::IoError(e) => format!("File system error: {}", e),
            ReportError::InvalidInputError {
                source_name,
                row,
                message,
            } => format!("{} has a problem at row {}: {}", source_name, row, message),
            ReportError::DegenerateJudgeError { q0, q1 } => format!(
                "Cannot correct for judge bias: specificity {:.3} + sensitivity {:.3} is 1",
                q0, q1
            ),
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
