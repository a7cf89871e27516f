use crate::convert::inspect::StructureSummary;
use crate::convert::types::RunReport;
use std::fmt;
use thiserror::Error;

/// Fatal conversion failures.
///
/// Per-record problems are not errors; they become [`Diagnostic`] entries and
/// the run continues. Everything here aborts the run.
///
/// [`Diagnostic`]: crate::convert::Diagnostic
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input blob matched none of the recognized shapes. Carries the
    /// structure summary verbatim so the caller can decide on manual handling.
    #[error("unsupported input format: {summary}")]
    UnsupportedFormat { summary: StructureSummary },

    /// The assembled table breaks a table-level invariant (duplicate pid,
    /// zero accepted records). Raised before anything is persisted.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// The persisted artifact disagrees with the in-memory table. The
    /// artifact must not be trusted.
    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),

    #[error("failed to parse input: {0}")]
    Parse(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

/// A fatal error paired with the run report gathered up to the failure, so
/// diagnostics survive the abort.
#[derive(Debug)]
pub struct RunFailure {
    pub error: ConvertError,
    pub report: RunReport,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
