use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QfError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Cannot read ROOT file '{}': {message}", .path.display())]
    RootReadError { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Unknown workspace '{label}'. Available: {available}")]
    UnknownWorkspace { label: String, available: String },

    #[error("Unknown POI '{name}'")]
    UnknownPoi { name: String },

    #[error("Failed to run '{program}': {details}")]
    SubprocessError { program: String, details: String },

    #[error("Job submission failed for '{}': {details}", .submit_file.display())]
    SubmissionError {
        submit_file: PathBuf,
        details: String,
    },

    #[error("Could not extract results from '{}': {details}", .path.display())]
    ExtractionError { path: PathBuf, details: String },

    #[error("Plotting failed: {message}")]
    PlotError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Execution,
    Results,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl QfError {
    pub fn config(message: impl Into<String>) -> Self {
        QfError::ConfigError {
            message: message.into(),
        }
    }

    pub fn plot(message: impl std::fmt::Display) -> Self {
        QfError::PlotError {
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QfError::IoError(_) => ErrorCategory::Io,
            QfError::CsvError(_)
            | QfError::SerializationError(_)
            | QfError::RootReadError { .. }
            | QfError::ExtractionError { .. } => ErrorCategory::Results,
            QfError::YamlError(_)
            | QfError::PatternError(_)
            | QfError::ConfigError { .. }
            | QfError::MissingConfigError { .. }
            | QfError::InvalidConfigValueError { .. }
            | QfError::ConfigValidationError { .. }
            | QfError::UnknownWorkspace { .. }
            | QfError::UnknownPoi { .. } => ErrorCategory::Configuration,
            QfError::SubprocessError { .. } | QfError::SubmissionError { .. } => {
                ErrorCategory::Execution
            }
            QfError::PlotError { .. } => ErrorCategory::Rendering,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Rendering => ErrorSeverity::Medium,
            ErrorCategory::Results => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Execution => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            QfError::IoError(_) => "Check that the output directory is writable and the disk is not full",
            QfError::RootReadError { .. } | QfError::ExtractionError { .. } => {
                "Inspect the fit log next to the output file; the fit may have crashed before writing results"
            }
            QfError::CsvError(_) => "Check that the scan text file has one point per line",
            QfError::SerializationError(_) => "Re-run the command; the summary file may be truncated",
            QfError::YamlError(_) | QfError::ConfigError { .. } | QfError::ConfigValidationError { .. } => {
                "Fix the analysis configuration file and run `qfscan config check`"
            }
            QfError::MissingConfigError { .. } | QfError::InvalidConfigValueError { .. } => {
                "Provide the missing or invalid value in the configuration or on the command line"
            }
            QfError::PatternError(_) => "Simplify the file pattern (only '*' and '?' wildcards are supported)",
            QfError::UnknownWorkspace { .. } => "Use one of the workspace labels listed in the configuration",
            QfError::UnknownPoi { .. } => "Check the POI name against scan_pois, channel_pois and float_pois",
            QfError::SubprocessError { .. } => "Make sure quickFit is on PATH (source the analysis setup script)",
            QfError::SubmissionError { .. } => "Check that condor_submit is available on this host",
            QfError::PlotError { .. } => "Check that the input files contain at least two valid points",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Execution => format!("Could not run the fit: {}", self),
            ErrorCategory::Results => format!("Could not read fit results: {}", self),
            ErrorCategory::Rendering => format!("Could not draw the plot: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, QfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = QfError::UnknownWorkspace {
            label: "quad".to_string(),
            available: "linear".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let io = QfError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_mentions_details() {
        let err = QfError::SubprocessError {
            program: "quickFit".to_string(),
            details: "not found".to_string(),
        };
        let msg = err.user_friendly_message();
        assert!(msg.starts_with("Could not run the fit"));
        assert!(msg.contains("quickFit"));
    }
}
