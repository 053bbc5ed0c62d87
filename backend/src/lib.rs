//! # Carteira - brokerage position workbook normalizer
//!
//! Carteira reads the multi-sheet position workbook exported by a brokerage
//! portal and turns it into one flat table of holdings, ready to be
//! imported into the portfolio store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ .xlsx/.xls  │────▶│   Parser    │────▶│ Normalizer  │────▶│   Export    │
//! │  (upload)   │     │ (calamine)  │     │ (routing)   │     │ (Acoes.xlsx)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carteira::{normalize_file, export, NormalizeOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = normalize_file("posicao.xlsx".as_ref(), NormalizeOptions::default()).await.unwrap();
//!     println!("Normalized {} positions", result.count);
//!     let _download = export(&result.records).unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Workbook, Sheet, Cell, PositionRecord
//! - [`parser`] - Spreadsheet container reading
//! - [`transform`] - Coercion, routing table, normalizer, pipeline
//! - [`export`] - Single-sheet workbook / CSV export
//! - [`validation`] - Routing table schema validation
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Normalization
pub mod transform;

// Export
pub mod export;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ExportError, PipelineError, RoutingError, ServerError, WorkbookError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{AssetType, Cell, PositionRecord, Row, Sheet, Workbook};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{detect_format, parse_bytes_auto, parse_workbook_file, ContainerFormat, ParseResult};

// =============================================================================
// Re-exports - Normalization
// =============================================================================

pub use transform::{
    coerce_number, coerce_string, default_routing_table, normalize, normalize_with, summarize,
    AssetSummary, DropReason, NormalizeResult, RoutingRule, RoutingTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    normalize_bytes, normalize_bytes_with, normalize_file, NormalizeOptions, PipelineOutput,
    WorkbookInfo,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{
    export, export_as, export_file_name, ExportArtifact, ExportFormat, ExportOutcome,
    EXPORT_HEADERS, EXPORT_SHEET_NAME,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_routing_table, validate_routing_table};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ExportRequest, NormalizeResponse};

// Server
pub mod server {
    pub use crate::api::server::{start_server, DEFAULT_PORT, PORT_ENV};
}
