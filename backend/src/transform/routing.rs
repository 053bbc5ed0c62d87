//! Routing table definition
//!
//! The routing table maps a sheet name to the asset category of its rows
//! and to the columns holding their current value. Supporting a new
//! brokerage tab is a new entry here, not new code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RoutingError, RoutingResult};
use crate::models::{AssetType, Row};
use crate::transform::coerce::coerce_number;
use crate::validation::validate_routing_table;

/// A complete routing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingTable {
    /// Version of the table format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Column holding the asset code/name in every routed sheet
    #[serde(default = "default_product_column")]
    pub product_column: String,

    /// Column holding the quantity in every routed sheet
    #[serde(default = "default_quantity_column")]
    pub quantity_column: String,

    /// Rules, tried in order; the first whose sheet list matches wins
    pub rules: Vec<RoutingRule>,
}

/// Routing rule for one family of sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    /// Sheet names this rule accepts (compared trimmed, case-insensitively)
    pub sheets: Vec<String>,

    /// Category assigned to every record of a matching sheet
    pub asset_type: AssetType,

    /// Value columns in priority order. The first one that coerces to a
    /// non-zero number is used.
    pub value_columns: Vec<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_product_column() -> String {
    "Produto".to_string()
}

fn default_quantity_column() -> String {
    "Quantidade".to_string()
}

/// Comparison key for sheet names.
fn sheet_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl RoutingTable {
    /// Parse a table from a JSON string, validating it first.
    pub fn from_json(json: &str) -> RoutingResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        validate_routing_table(&value).map_err(RoutingError::Invalid)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load and validate a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RoutingResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Find the rule for a sheet name, if any.
    pub fn route(&self, sheet_name: &str) -> Option<&RoutingRule> {
        let key = sheet_key(sheet_name);
        self.rules
            .iter()
            .find(|rule| rule.sheets.iter().any(|s| sheet_key(s) == key))
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        default_routing_table()
    }
}

impl RoutingRule {
    pub fn new(sheets: &[&str], asset_type: AssetType, value_columns: &[&str]) -> Self {
        Self {
            sheets: sheets.iter().map(|s| s.to_string()).collect(),
            asset_type,
            value_columns: value_columns.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Resolve the current value of a row.
    ///
    /// A coerced zero counts as absent, so a genuine zero balance in the
    /// preferred column also falls through to the next one.
    pub fn value(&self, row: &Row) -> f64 {
        self.value_columns
            .iter()
            .map(|col| coerce_number(row.get(col)))
            .find(|v| *v != 0.0)
            .unwrap_or(0.0)
    }
}

/// Built-in table for the B3 investor-area position export.
pub fn default_routing_table() -> RoutingTable {
    let valor = "Valor Atualizado";

    RoutingTable {
        version: default_version(),
        description: "B3 consolidated position export".to_string(),
        product_column: default_product_column(),
        quantity_column: default_quantity_column(),
        rules: vec![
            RoutingRule::new(&["acoes"], AssetType::Equity, &[valor]),
            // Shares on loan are still equity
            RoutingRule::new(&["empréstimos", "emprestimos"], AssetType::Equity, &[valor]),
            RoutingRule::new(
                &["fundo de investimento", "fundos"],
                AssetType::FundShare,
                &[valor],
            ),
            // Mark-to-curve first, market close only when the curve value is missing
            RoutingRule::new(
                &["renda fixa"],
                AssetType::FixedIncome,
                &["Valor Atualizado CURVA", "Valor Atualizado FECHAMENTO"],
            ),
            RoutingRule::new(&["tesouro direto"], AssetType::FixedIncome, &[valor]),
        ],
    }
}
