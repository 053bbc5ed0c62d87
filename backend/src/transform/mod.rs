//! Transformation module.
//!
//! This module turns parsed workbooks into position records:
//! - Coerce: cell to number/string conversion
//! - Routing: sheet name to asset type and value columns
//! - Normalizer: apply the routing table to every sheet
//! - Summary: per-asset-type totals
//! - Pipeline: parse + normalize with logging

pub mod coerce;
pub mod normalizer;
pub mod pipeline;
pub mod routing;
pub mod summary;

pub use coerce::{coerce_number, coerce_string};
pub use normalizer::{normalize, normalize_with, DropReason, DroppedRow, NormalizeResult};
pub use pipeline::*;
pub use routing::{default_routing_table, RoutingRule, RoutingTable};
pub use summary::{summarize, total_value, AssetSummary};
