//! Domain models for the Carteira normalization pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Workbook`] - Parsed spreadsheet container (ordered named sheets)
//! - [`Sheet`] - One named tab, rows keyed by header label
//! - [`Cell`] - Raw cell value as read from the container
//! - [`PositionRecord`] - One normalized holding
//! - [`AssetType`] - Category assigned by the routing table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Raw workbook
// =============================================================================

/// Raw value of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    #[default]
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// One data row: header label -> cell.
pub type Row = HashMap<String, Cell>;

/// A named tab of a workbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    /// Tab name, used as the routing key.
    pub name: String,
    /// Header labels in column order.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Data rows (header row excluded).
    #[serde(default)]
    pub rows: Vec<Row>,
    /// 1-based spreadsheet row of each entry in `rows`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_numbers: Vec<usize>,
}

impl Sheet {
    /// Create an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers: Vec::new(),
            rows: Vec::new(),
            row_numbers: Vec::new(),
        }
    }

    /// Spreadsheet row number of data row `index`.
    ///
    /// Sheets built without row numbers are assumed to have the header on
    /// row 1 and no gaps.
    pub fn sheet_row(&self, index: usize) -> usize {
        self.row_numbers.get(index).copied().unwrap_or(index + 2)
    }

    /// Append a row given as `(header, cell)` pairs. Unknown headers are
    /// registered in first-seen order.
    pub fn with_row<K, V, I>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Cell>,
    {
        let mut row = Row::new();
        for (key, value) in cells {
            let key = key.into();
            if !self.headers.contains(&key) {
                self.headers.push(key.clone());
            }
            row.insert(key, value.into());
        }
        self.rows.push(row);
        self
    }
}

/// A parsed spreadsheet container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Total number of data rows across all sheets.
    pub fn row_count(&self) -> usize {
        self.sheets.iter().map(|s| s.rows.len()).sum()
    }
}

// =============================================================================
// Asset Type
// =============================================================================

/// Category of a holding.
///
/// Never read from the sheet; the routing rule that matched the sheet
/// name decides it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    /// Stocks, including shares on loan.
    Equity,
    /// Investment fund quotas.
    FundShare,
    /// Bonds, CDBs, treasury titles.
    FixedIncome,
}

impl AssetType {
    /// Label used in exports and JSON.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::FundShare => "fund-share",
            Self::FixedIncome => "fixed-income",
        }
    }

    /// Parse a label back. Accepts the exported form only.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "equity" => Some(Self::Equity),
            "fund-share" => Some(Self::FundShare),
            "fixed-income" => Some(Self::FixedIncome),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Position Record
// =============================================================================

/// One normalized holding, ready for the import pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    /// Asset code or display name. Never empty.
    pub product: String,
    /// Quantity held. Always > 0.
    pub quantity: f64,
    /// Current monetary value of the holding.
    pub updated_value: f64,
    pub asset_type: AssetType,
}

impl PositionRecord {
    /// Check the invariants the normalizer guarantees. Records that come in
    /// from outside (JSON) go through this before export.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.product.trim().is_empty() {
            return Err("empty product");
        }
        if self.quantity.is_nan() || self.quantity <= 0.0 {
            return Err("quantity not positive");
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_labels() {
        for t in [AssetType::Equity, AssetType::FundShare, AssetType::FixedIncome] {
            assert_eq!(AssetType::from_label(t.label()), Some(t));
        }
        assert_eq!(AssetType::from_label("crypto"), None);
    }

    #[test]
    fn test_asset_type_serde_matches_label() {
        let json = serde_json::to_string(&AssetType::FundShare).unwrap();
        assert_eq!(json, "\"fund-share\"");
    }

    #[test]
    fn test_position_record_camel_case() {
        let record = PositionRecord {
            product: "PETR4".into(),
            quantity: 100.0,
            updated_value: 2500.0,
            asset_type: AssetType::Equity,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["updatedValue"], 2500.0);
        assert_eq!(json["assetType"], "equity");
    }

    #[test]
    fn test_sheet_builder_registers_headers() {
        let sheet = Sheet::new("Acoes")
            .with_row([("Produto", "PETR4"), ("Quantidade", "100")])
            .with_row([("Produto", "VALE3"), ("Extra", "x")]);

        assert_eq!(sheet.headers, vec!["Produto", "Quantidade", "Extra"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].get("Quantidade"), None);
    }

    #[test]
    fn test_sheet_row_numbers() {
        let built = Sheet::new("Acoes")
            .with_row([("Produto", "PETR4")])
            .with_row([("Produto", "VALE3")]);
        assert_eq!(built.sheet_row(0), 2);
        assert_eq!(built.sheet_row(1), 3);

        let parsed = Sheet {
            row_numbers: vec![3, 7],
            ..built
        };
        assert_eq!(parsed.sheet_row(1), 7);
    }

    #[test]
    fn test_position_record_check() {
        let mut record = PositionRecord {
            product: "PETR4".into(),
            quantity: 100.0,
            updated_value: 2500.0,
            asset_type: AssetType::Equity,
        };
        assert!(record.check().is_ok());

        record.quantity = 0.0;
        assert_eq!(record.check(), Err("quantity not positive"));

        record.quantity = 1.0;
        record.product = "  ".into();
        assert_eq!(record.check(), Err("empty product"));
    }

    #[test]
    fn test_workbook_row_count() {
        let wb = Workbook::new(vec![
            Sheet::new("a").with_row([("x", 1.0)]),
            Sheet::new("b").with_row([("x", 1.0)]).with_row([("x", 2.0)]),
        ]);
        assert_eq!(wb.row_count(), 3);
        assert_eq!(wb.sheet_names(), vec!["a", "b"]);
    }
}
