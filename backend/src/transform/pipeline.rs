//! High-level pipeline API: read a brokerage workbook and normalize it.
//!
//! Combines container parsing, routing-table resolution, normalization
//! and summary, logging each step.
//!
//! # Example
//!
//! ```rust,ignore
//! use carteira::{normalize_file, NormalizeOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = normalize_file(Path::new("posicao.xlsx"), NormalizeOptions::default()).await?;
//!     println!("{} positions", result.count);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::normalizer::{normalize_with, DropReason, NormalizeResult};
use super::routing::RoutingTable;
use super::summary::{summarize, total_value, AssetSummary};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, RoutingResult, WorkbookError};
use crate::models::PositionRecord;
use crate::parser::{parse_bytes_auto, ContainerFormat, ParseResult};

/// Environment variable naming a routing table file.
pub const ROUTES_ENV: &str = "CARTEIRA_ROUTES";

/// Options for the normalization pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Use a routing table file instead of the built-in one
    pub routes_path: Option<String>,
}

impl NormalizeOptions {
    /// Options taken from the environment (`CARTEIRA_ROUTES`).
    pub fn from_env() -> Self {
        Self {
            routes_path: std::env::var(ROUTES_ENV)
                .ok()
                .filter(|p| !p.trim().is_empty()),
        }
    }

    /// Resolve the routing table these options point at.
    pub fn routing_table(&self) -> RoutingResult<RoutingTable> {
        match &self.routes_path {
            Some(path) => RoutingTable::load(path),
            None => Ok(RoutingTable::default()),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// Normalized records, ready for import
    pub records: Vec<PositionRecord>,

    /// Number of records
    pub count: usize,

    /// Sheets no routing rule matched
    pub skipped_sheets: Vec<String>,

    /// Dropped row counts by reason
    pub dropped_rows: HashMap<DropReason, usize>,

    /// Totals per asset type
    pub summary: Vec<AssetSummary>,

    /// Workbook parsing metadata
    pub workbook_info: WorkbookInfo,
}

/// Workbook file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookInfo {
    pub format: ContainerFormat,
    pub sheet_names: Vec<String>,
    pub row_count: usize,
}

/// Normalize a workbook file.
///
/// The routing table is resolved before the file is touched, so a bad
/// table fails fast. Reading the file is the only await point.
pub async fn normalize_file(
    path: &Path,
    options: NormalizeOptions,
) -> Result<PipelineOutput, PipelineError> {
    let table = options.routing_table()?;
    log_info(format!("📖 Reading {}...", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(WorkbookError::from)?;
    normalize_bytes_with(&bytes, &table)
}

/// Normalize workbook bytes.
///
/// Same as `normalize_file` but accepts raw bytes (e.g. an upload).
pub fn normalize_bytes(
    bytes: &[u8],
    options: &NormalizeOptions,
) -> Result<PipelineOutput, PipelineError> {
    let table = options.routing_table()?;
    normalize_bytes_with(bytes, &table)
}

/// Normalize workbook bytes with an already-resolved routing table.
pub fn normalize_bytes_with(
    bytes: &[u8],
    table: &RoutingTable,
) -> Result<PipelineOutput, PipelineError> {
    log_info("Detecting spreadsheet format...");
    let parse_result = parse_bytes_auto(bytes)?;
    log_success(format!("Detected format: {}", parse_result.format));

    Ok(normalize_parsed(parse_result, table))
}

/// Normalize an already-parsed workbook.
pub fn normalize_parsed(parse_result: ParseResult, table: &RoutingTable) -> PipelineOutput {
    let workbook_info = WorkbookInfo {
        format: parse_result.format,
        sheet_names: parse_result.sheet_names.clone(),
        row_count: parse_result.workbook.row_count(),
    };

    log_info(format!("📋 Workbook has {} sheets:", workbook_info.sheet_names.len()));
    for sheet in &parse_result.workbook.sheets {
        let routed = match table.route(&sheet.name) {
            Some(rule) => format!("→ {}", rule.asset_type),
            None => "(skipped)".to_string(),
        };
        log_info_indent(format!("{} [{} rows] {}", sheet.name, sheet.rows.len(), routed), 1);
    }

    log_info("⚙️  Normalizing positions...");
    let result = normalize_with(&parse_result.workbook, table);
    print_normalize_result(&result);

    let summary = summarize(&result.records);
    for group in &summary {
        log_info_indent(
            format!("{}: {} positions, value {:.2}", group.asset_type, group.positions, group.total_value),
            1,
        );
    }
    if !result.records.is_empty() {
        log_success(format!("Total value: {:.2}", total_value(&result.records)));
    }

    let mut dropped_rows: HashMap<DropReason, usize> = HashMap::new();
    for d in &result.dropped {
        *dropped_rows.entry(d.reason).or_default() += 1;
    }

    PipelineOutput {
        count: result.count(),
        records: result.records,
        skipped_sheets: result.skipped_sheets,
        dropped_rows,
        summary,
        workbook_info,
    }
}

/// Print normalization result details
fn print_normalize_result(result: &NormalizeResult) {
    log_success(format!("Generated {} position records", result.count()));

    if !result.skipped_sheets.is_empty() {
        log_warning(format!(
            "{} sheet(s) without a routing rule: {}",
            result.skipped_sheets.len(),
            result.skipped_sheets.join(", ")
        ));
    }

    if !result.dropped.is_empty() {
        log_warning(format!("{} rows dropped", result.dropped.len()));

        // Group by reason
        let mut reasons: Vec<(DropReason, Vec<String>)> = Vec::new();
        for d in &result.dropped {
            let at = format!("{}#{}", d.sheet, d.row);
            match reasons.iter_mut().find(|(r, _)| *r == d.reason) {
                Some((_, rows)) => rows.push(at),
                None => reasons.push((d.reason, vec![at])),
            }
        }

        for (reason, rows) in &reasons {
            let sample: Vec<&str> = rows.iter().take(5).map(|s| s.as_str()).collect();
            let more = if rows.len() > 5 { format!("... +{}", rows.len() - 5) } else { String::new() };
            log_warning(format!("• {} (rows: {}{})", reason.describe(), sample.join(", "), more));
        }
    }
}
