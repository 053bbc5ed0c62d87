//! JSON Schema validation for routing tables.
//!
//! A routing table supplied by the user (`--routes`, `CARTEIRA_ROUTES`) is
//! checked against an embedded JSON Schema Draft 7 before it is
//! deserialized, so mistakes come back as readable messages instead of a
//! serde error on the first bad field.
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from `schemas/` directory:
//! - `routing-table.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use carteira::validate_routing_table;
//!
//! let table = json!({
//!     "rules": [
//!         { "sheets": ["acoes"], "assetType": "equity", "valueColumns": ["Valor Atualizado"] }
//!     ]
//! });
//! assert!(validate_routing_table(&table).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static ROUTING_TABLE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/routing-table.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate against the routing table schema.
pub fn validate_routing_table(data: &Value) -> Result<(), Vec<String>> {
    validate(&ROUTING_TABLE_SCHEMA, data)
}

/// Quick check against the routing table schema.
pub fn is_valid_routing_table(data: &Value) -> bool {
    is_valid(&ROUTING_TABLE_SCHEMA, data)
}
