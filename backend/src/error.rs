//! Error types for the Carteira normalization pipeline.
//!
//! Only a few things can actually fail:
//!
//! - [`WorkbookError`] - the upload is not a readable spreadsheet container
//! - [`RoutingError`] - a user-supplied routing table is unreadable or invalid
//! - [`ExportError`] - the export writer failed
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Bad cells and unknown sheets are never errors; they only reduce the
//! number of records produced. Conversion is automatic via `From`
//! implementations, allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Workbook (container) Errors
// =============================================================================

/// Errors while reading a spreadsheet container.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes carry no known spreadsheet signature.
    #[error("File is not a spreadsheet (expected .xlsx or .xls)")]
    UnknownFormat,

    /// Signature matched but the container could not be decoded.
    #[error("Could not read spreadsheet: {0}")]
    Container(String),
}

// =============================================================================
// Routing Table Errors
// =============================================================================

/// Errors loading a routing table.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// IO error.
    #[error("Routing table IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Routing table JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema validation failed.
    #[error("Invalid routing table: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors producing the export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// XLSX writer failure.
    #[error("XLSX export failed: {0}")]
    Xlsx(String),

    /// CSV writer failure.
    #[error("CSV export failed: {0}")]
    Csv(String),

    /// A record breaks the output invariants (empty product, quantity <= 0).
    #[error("Record {index}: {reason}")]
    InvalidRecord { index: usize, reason: &'static str },
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::normalize_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Spreadsheet container error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Routing table error.
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A normalization is already running.
    #[error("A workbook is already being processed")]
    Busy,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for workbook operations.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for routing table operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
