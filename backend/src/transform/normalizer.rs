//! Workbook normalizer
//!
//! Applies a [`RoutingTable`] to a parsed [`Workbook`] and produces the
//! flat list of [`PositionRecord`]s. Never fails: unrouted sheets and bad
//! rows only shrink the output.

use serde::Serialize;

use super::coerce::{coerce_number, coerce_string};
use super::routing::{default_routing_table, RoutingRule, RoutingTable};
use crate::models::{PositionRecord, Row, Workbook};

/// Result of normalizing a workbook
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeResult {
    /// Surviving records, in sheet order then row order
    pub records: Vec<PositionRecord>,
    /// Sheets with no matching routing rule
    pub skipped_sheets: Vec<String>,
    /// Rows of routed sheets that produced no record
    pub dropped: Vec<DroppedRow>,
}

/// A routed row that did not produce a record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    pub sheet: String,
    /// Spreadsheet row number (1-based, as shown by a spreadsheet app)
    pub row: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropReason {
    /// Product cell empty, blank or missing
    EmptyProduct,
    /// Quantity coerced to zero or below
    NonPositiveQuantity,
}

impl DropReason {
    pub fn describe(&self) -> &'static str {
        match self {
            DropReason::EmptyProduct => "empty product",
            DropReason::NonPositiveQuantity => "quantity not positive",
        }
    }
}

impl NormalizeResult {
    /// Number of records produced.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Normalized: {} records, {} rows dropped, {} sheets skipped",
            self.records.len(),
            self.dropped.len(),
            self.skipped_sheets.len()
        )
    }
}

/// Normalize a workbook with the built-in routing table.
///
/// # Example
/// ```ignore
/// let result = normalize(&workbook);
/// println!("{} positions", result.count());
/// ```
pub fn normalize(workbook: &Workbook) -> NormalizeResult {
    normalize_with(workbook, &default_routing_table())
}

/// Normalize a workbook with an explicit routing table.
pub fn normalize_with(workbook: &Workbook, table: &RoutingTable) -> NormalizeResult {
    let mut result = NormalizeResult::default();

    for sheet in &workbook.sheets {
        let Some(rule) = table.route(&sheet.name) else {
            result.skipped_sheets.push(sheet.name.clone());
            continue;
        };

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            match normalize_row(row, rule, table) {
                Ok(record) => result.records.push(record),
                Err(reason) => result.dropped.push(DroppedRow {
                    sheet: sheet.name.clone(),
                    row: sheet.sheet_row(row_idx),
                    reason,
                }),
            }
        }
    }

    result
}

/// Build one record, or say why the row has none.
fn normalize_row(
    row: &Row,
    rule: &RoutingRule,
    table: &RoutingTable,
) -> Result<PositionRecord, DropReason> {
    let product = coerce_string(row.get(&table.product_column));
    if product.is_empty() {
        return Err(DropReason::EmptyProduct);
    }

    let quantity = coerce_number(row.get(&table.quantity_column));
    if quantity <= 0.0 {
        return Err(DropReason::NonPositiveQuantity);
    }

    Ok(PositionRecord {
        product,
        quantity,
        updated_value: rule.value(row),
        asset_type: rule.asset_type,
    })
}
