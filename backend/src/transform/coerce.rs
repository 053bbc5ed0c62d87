//! Cell coercion.
//!
//! Every conversion from a raw [`Cell`] to a typed value goes through here.
//! Coercion never fails: a cell that cannot be read degrades to `0.0` or
//! an empty string, and the record-level invariant filters the row later.

use crate::models::Cell;

/// Coerce a cell into a number. Anything unreadable is `0.0`.
///
/// Strings are trimmed and parsed as plain decimals (`"2500.00"`, `"-3"`,
/// `"1e3"`). Locale-formatted strings such as `"1.234,56"` are not
/// interpreted.
pub fn coerce_number(cell: Option<&Cell>) -> f64 {
    let value = match cell {
        Some(Cell::Number(n)) => *n,
        Some(Cell::Text(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Cell::Bool(_)) | Some(Cell::Empty) | None => 0.0,
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Coerce a cell into a trimmed string. Missing cells are `""`.
pub fn coerce_string(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Text(s)) => s.trim().to_string(),
        Some(Cell::Number(n)) => format_number(*n),
        Some(Cell::Bool(b)) => b.to_string(),
        Some(Cell::Empty) | None => String::new(),
    }
}

/// Render a numeric cell as text without a trailing `.0` for integers,
/// so a product code stored as a number (`123456`) reads back as typed.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_number_cells_pass_through() {
        assert_eq!(coerce_number(Some(&Cell::Number(2500.5))), 2500.5);
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(coerce_number(Some(&text("100"))), 100.0);
        assert_eq!(coerce_number(Some(&text(" 2500.00 "))), 2500.0);
        assert_eq!(coerce_number(Some(&text("-3.5"))), -3.5);
    }

    #[test]
    fn test_unreadable_is_zero() {
        assert_eq!(coerce_number(None), 0.0);
        assert_eq!(coerce_number(Some(&Cell::Empty)), 0.0);
        assert_eq!(coerce_number(Some(&text(""))), 0.0);
        assert_eq!(coerce_number(Some(&text("abc"))), 0.0);
        assert_eq!(coerce_number(Some(&text("1.234,56"))), 0.0);
        assert_eq!(coerce_number(Some(&Cell::Bool(true))), 0.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(coerce_number(Some(&text("NaN"))), 0.0);
        assert_eq!(coerce_number(Some(&text("inf"))), 0.0);
        assert_eq!(coerce_number(Some(&Cell::Number(f64::INFINITY))), 0.0);
    }

    #[test]
    fn test_string_trimmed() {
        assert_eq!(coerce_string(Some(&text("  PETR4 "))), "PETR4");
        assert_eq!(coerce_string(Some(&text("   "))), "");
        assert_eq!(coerce_string(None), "");
        assert_eq!(coerce_string(Some(&Cell::Empty)), "");
    }

    #[test]
    fn test_numeric_product_code() {
        assert_eq!(coerce_string(Some(&Cell::Number(123456.0))), "123456");
        assert_eq!(coerce_string(Some(&Cell::Number(1.5))), "1.5");
    }
}
