//! Per-category totals of normalized records.
//!
//! Display only; records are never merged.
//!
//! ```text
//! PETR4  equity        100   2500.00       ┌──────────────┬───┬─────────┐
//! VALE3  equity         10    650.00   →   │ equity       │ 2 │ 3150.00 │
//! LCI    fixed-income    2   5000.00       │ fixed-income │ 1 │ 5000.00 │
//!                                          └──────────────┴───┴─────────┘
//! ```

use serde::Serialize;

use crate::models::{AssetType, PositionRecord};

/// Totals for one asset type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub asset_type: AssetType,
    pub positions: usize,
    pub total_quantity: f64,
    pub total_value: f64,
}

/// Group records by asset type, in first-seen order.
pub fn summarize(records: &[PositionRecord]) -> Vec<AssetSummary> {
    let mut groups: Vec<AssetSummary> = Vec::new();

    for record in records {
        let idx = match groups.iter().position(|g| g.asset_type == record.asset_type) {
            Some(i) => i,
            None => {
                groups.push(AssetSummary {
                    asset_type: record.asset_type,
                    positions: 0,
                    total_quantity: 0.0,
                    total_value: 0.0,
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[idx];
        group.positions += 1;
        group.total_quantity += record.quantity;
        group.total_value += record.updated_value;
    }

    groups
}

/// Sum of `updated_value` over all records.
pub fn total_value(records: &[PositionRecord]) -> f64 {
    records.iter().map(|r| r.updated_value).sum()
}
