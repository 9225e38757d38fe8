//! Error types for the analysis engine.
//!
//! Defects found in the analyzed program are never errors: they are reported
//! as [`Diagnostic`](crate::Diagnostic)s. `AnalysisError` covers the run
//! itself failing, such as cancellation, unreadable facts or configuration, or
//! a malformed trace when the engine is configured to fail on those.

use thiserror::Error;

/// Analysis engine errors
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::AnalysisError;
///
/// let dangling = AnalysisError::DanglingHandle {
///     procedure: "Worker.RunAsync".to_string(),
///     handle: "scope".to_string(),
/// };
/// assert_eq!(
///     dangling.to_string(),
///     "Dangling handle 'scope' in procedure Worker.RunAsync"
/// );
/// ```
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The run was cancelled before it completed
    #[error("Analysis cancelled")]
    Cancelled,
    /// A trace event referenced a handle never created in its procedure
    #[error("Dangling handle '{handle}' in procedure {procedure}")]
    DanglingHandle { procedure: String, handle: String },
    /// A trace's control-flow graph is inconsistent
    #[error("Malformed trace for procedure {procedure}: {reason}")]
    MalformedTrace { procedure: String, reason: String },
    /// Fact set could not be read
    #[error("Invalid facts: {0}")]
    InvalidFacts(String),
    /// Configuration could not be read or contained an invalid value
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O failure while loading facts or configuration from disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::InvalidFacts(err.to_string())
    }
}

impl From<serde_yaml::Error> for AnalysisError {
    fn from(err: serde_yaml::Error) -> Self {
        AnalysisError::InvalidFacts(err.to_string())
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
