//! Error types for the analyzer library
//!
//! Only caller misuse surfaces as `AnalyzerError`. Tool failures are
//! reported as `HelperError` internally and turned into warnings by the
//! backends.

use std::path::PathBuf;
use std::time::Duration;

/// Errors returned by the factory and by `Analyzer::analyze`
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("unsupported language: {language} (supported: {supported})")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("invalid working directory {}: {reason}", path.display())]
    InvalidWorkDir { path: PathBuf, reason: String },
}

/// Failure of an external helper process
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("{0} not found in PATH")]
    NotFound(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to helper: {0}")]
    Io(#[from] std::io::Error),

    #[error("output exceeds maximum size ({size} > {limit} bytes)")]
    OutputTooLarge { size: usize, limit: usize },

    #[error("time budget of {:?} exceeded", .0)]
    DeadlineExceeded(Duration),

    #[error("exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

impl HelperError {
    pub fn is_deadline(&self) -> bool {
        matches!(self, HelperError::DeadlineExceeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language_message_lists_supported_set() {
        let err = AnalyzerError::UnsupportedLanguage {
            language: "rust".into(),
            supported: "go, typescript, python".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unsupported language: rust"));
        assert!(msg.contains("go, typescript, python"));
    }

    #[test]
    fn test_output_too_large_message() {
        let err = HelperError::OutputTooLarge { size: 11, limit: 10 };
        assert_eq!(err.to_string(), "output exceeds maximum size (11 > 10 bytes)");
        assert!(!err.is_deadline());
        assert!(HelperError::DeadlineExceeded(Duration::from_secs(1)).is_deadline());
    }
}
