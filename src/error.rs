//! Error types shared across the balancing pipeline.

use std::path::PathBuf;

/// Result type for split-test operations.
pub type SplitResult<T> = Result<T, SplitError>;

/// Errors that can occur while ingesting reports and balancing tests.
///
/// # Error Categories
///
/// - **Recoverable**: [`SplitError::Parse`] is scoped to a single report file.
///   The ingestion driver logs it and carries on with the remaining reports.
/// - **Terminal, not a failure**: [`SplitError::MissingInput`] means no test
///   files were discovered. Callers should report "nothing to do" and exit
///   successfully.
/// - **Contract violations**: [`SplitError::InvalidArgument`] aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// A report file could not be parsed.
    #[error("Failed to parse {}: {message}", source_path.display())]
    Parse {
        source_path: PathBuf,
        message: String,
    },

    /// No test files were found, so there is nothing to balance.
    #[error("No test files found")]
    MissingInput,

    /// A caller supplied a value outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Test discovery failed.
    #[error(transparent)]
    Discovery(#[from] crate::discovery::DiscoveryError),

    /// I/O error reading files or directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub(crate) fn parse(source_path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SplitError::Parse {
            source_path: source_path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SplitError::InvalidArgument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_source() {
        let err = SplitError::parse("reports/rspec.json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Failed to parse reports/rspec.json: expected value at line 1"
        );
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = SplitError::invalid("node count must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid argument: node count must be at least 1"
        );
    }
}
