//! REST API types.
//!
//! `records` is the normalized import table; the import pathway persists
//! it as-is.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::export::ExportFormat;
use crate::models::PositionRecord;
use crate::transform::pipeline::PipelineOutput;
use crate::transform::summary::AssetSummary;

/// Response sent after a workbook upload is normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" when records were produced, "empty" otherwise
    pub status: String,

    /// Normalized records
    pub records: Vec<PositionRecord>,

    pub metadata: ResponseMetadata,
}

/// Metadata about the normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub count: usize,
    pub skipped_sheets: Vec<String>,
    /// Dropped row counts keyed by reason
    pub dropped_rows: HashMap<String, usize>,
    pub summary: Vec<SummaryEntry>,
    pub workbook: WorkbookMetadata,
}

/// Workbook file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookMetadata {
    pub file_name: Option<String>,
    pub format: String,
    pub sheets: Vec<String>,
    pub row_count: usize,
}

/// Totals for one asset type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub asset_type: String,
    pub positions: usize,
    pub total_quantity: f64,
    pub total_value: f64,
}

impl From<AssetSummary> for SummaryEntry {
    fn from(s: AssetSummary) -> Self {
        SummaryEntry {
            asset_type: s.asset_type.label().to_string(),
            positions: s.positions,
            total_quantity: s.total_quantity,
            total_value: s.total_value,
        }
    }
}

impl NormalizeResponse {
    pub fn new(result: PipelineOutput, file_name: Option<String>) -> Self {
        let dropped_rows = result
            .dropped_rows
            .into_iter()
            .map(|(reason, n)| (reason.describe().to_string(), n))
            .collect();

        NormalizeResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if result.count > 0 { "ready" } else { "empty" }.to_string(),
            records: result.records,
            metadata: ResponseMetadata {
                count: result.count,
                skipped_sheets: result.skipped_sheets,
                dropped_rows,
                summary: result.summary.into_iter().map(SummaryEntry::from).collect(),
                workbook: WorkbookMetadata {
                    file_name,
                    format: result.workbook_info.format.to_string(),
                    sheets: result.workbook_info.sheet_names,
                    row_count: result.workbook_info.row_count,
                },
            },
        }
    }
}

/// Body of `POST /api/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub records: Vec<PositionRecord>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// Reply when an export had no records.
pub fn nothing_to_export_response() -> Value {
    json!({
        "status": "empty",
        "message": "Nothing to export"
    })
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
        "metadata": {
            "count": 0
        }
    })
}
