//! Error types for the panic analysis pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for panic analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No panic log given (use --log <path>)")]
    LogNotSpecified,

    #[error("Panic log not found: {}", .0.display())]
    LogNotFound(PathBuf),

    #[error("Failed to read panic log {}: {source}", .path.display())]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown CPU: {0}")]
    UnknownArchitecture(String),

    #[error("Cannot find 'CPU Exception' marker in the panic log")]
    ExceptionMarkerNotFound,

    #[error("Can not find {tool} (searched {})", .searched.display())]
    ToolchainNotFound { tool: String, searched: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Pipeline stage that produced the error, used in fatal diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::LogNotSpecified
            | AnalysisError::LogNotFound(_)
            | AnalysisError::LogUnreadable { .. } => "load-log",
            AnalysisError::UnknownArchitecture(_) => "select-cpu",
            AnalysisError::ExceptionMarkerNotFound => "parse",
            AnalysisError::ToolchainNotFound { .. } => "resolve",
            AnalysisError::InvalidConfig(_) => "config",
            AnalysisError::IoError(_) | AnalysisError::SerializationError(_) => "emit",
        }
    }

    /// Process exit status for this error. Usage errors (2) are left to clap.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::LogNotSpecified
            | AnalysisError::LogNotFound(_)
            | AnalysisError::LogUnreadable { .. } => 3,
            AnalysisError::UnknownArchitecture(_) => 4,
            AnalysisError::ExceptionMarkerNotFound => 5,
            AnalysisError::ToolchainNotFound { .. } => 6,
            AnalysisError::InvalidConfig(_)
            | AnalysisError::IoError(_)
            | AnalysisError::SerializationError(_) => 1,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while loading a firmware ELF image
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("Failed to read ELF file {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ELF header: {}", .0.display())]
    InvalidMagic(PathBuf),

    #[error("Failed to parse ELF file {}: {reason}", .path.display())]
    ParseFailed { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_fatal_class() {
        let codes = [
            AnalysisError::LogNotFound(PathBuf::from("panic.log")).exit_code(),
            AnalysisError::UnknownArchitecture("arm".into()).exit_code(),
            AnalysisError::ExceptionMarkerNotFound.exit_code(),
            AnalysisError::ToolchainNotFound {
                tool: "riscv64-unknown-elf-addr2line".into(),
                searched: PathBuf::from("toolchain/bin"),
            }
            .exit_code(),
        ];
        assert_eq!(codes, [3, 4, 5, 6]);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(AnalysisError::LogNotSpecified.stage(), "load-log");
        assert_eq!(AnalysisError::UnknownArchitecture("x".into()).stage(), "select-cpu");
        assert_eq!(AnalysisError::ExceptionMarkerNotFound.stage(), "parse");
    }

    #[test]
    fn test_unknown_architecture_names_identifier() {
        let error = AnalysisError::UnknownArchitecture("cortex-m4".into());
        assert!(error.to_string().contains("cortex-m4"));
    }
}
