//! Spreadsheet container reader with format auto-detection.
//!
//! Turns `.xlsx` / `.xls` (and `.xlsb` / `.ods`) bytes into a [`Workbook`] of header-keyed rows.
//! No brokerage-specific logic here.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{Cell, Row, Sheet, Workbook};

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const CFB_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Spreadsheet container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Office Open XML (ZIP based).
    Xlsx,
    /// Legacy BIFF inside an OLE compound file.
    Xls,
    /// Excel binary workbook (ZIP based).
    Xlsb,
    /// OpenDocument spreadsheet (ZIP based).
    Ods,
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerFormat::Xlsx => f.write_str("xlsx"),
            ContainerFormat::Xls => f.write_str("xls"),
            ContainerFormat::Xlsb => f.write_str("xlsb"),
            ContainerFormat::Ods => f.write_str("ods"),
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed workbook
    pub workbook: Workbook,
    /// Container format the reader actually opened
    pub format: ContainerFormat,
    /// Sheet names in workbook order
    pub sheet_names: Vec<String>,
}

/// Detect the container format from the file signature.
///
/// Every ZIP container is reported as `Xlsx` here; [`parse_bytes_auto`]
/// reports the format that actually opened.
pub fn detect_format(bytes: &[u8]) -> Option<ContainerFormat> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        Some(ContainerFormat::Xlsx)
    } else if bytes.starts_with(CFB_SIGNATURE) {
        Some(ContainerFormat::Xls)
    } else {
        None
    }
}

/// Parse a spreadsheet file with format auto-detection.
///
/// # Example
/// ```ignore
/// let result = parse_workbook_file("/path/to/posicao.xlsx")?;
/// println!("Format: {}, sheets: {:?}", result.format, result.sheet_names);
/// ```
pub fn parse_workbook_file<P: AsRef<Path>>(path: P) -> WorkbookResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse spreadsheet bytes with format auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> WorkbookResult<ParseResult> {
    detect_format(bytes).ok_or(WorkbookError::UnknownFormat)?;

    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| WorkbookError::Container(e.to_string()))?;

    let format = match &sheets {
        Sheets::Xls(_) => ContainerFormat::Xls,
        Sheets::Xlsx(_) => ContainerFormat::Xlsx,
        Sheets::Xlsb(_) => ContainerFormat::Xlsb,
        Sheets::Ods(_) => ContainerFormat::Ods,
    };

    let sheet_names = sheets.sheet_names();
    let mut workbook = Workbook::default();

    for name in &sheet_names {
        let range = sheets
            .worksheet_range(name)
            .map_err(|e| WorkbookError::Container(format!("sheet '{}': {}", name, e)))?;
        workbook.sheets.push(range_to_sheet(name, &range));
    }

    Ok(ParseResult {
        workbook,
        format,
        sheet_names,
    })
}

/// Convert a worksheet range into a header-keyed sheet.
///
/// The first row holding any value is the header row. Each kept data row
/// records its 1-based row number in the sheet.
fn range_to_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range
        .rows()
        .enumerate()
        .skip_while(|(_, r)| r.iter().all(is_blank));

    let Some((_, header_row)) = rows.next() else {
        return sheet;
    };

    sheet.headers = header_row
        .iter()
        .map(|c| match c {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    for (offset, raw) in rows {
        if raw.iter().all(is_blank) {
            continue;
        }

        let mut row = Row::new();
        for (i, header) in sheet.headers.iter().enumerate() {
            if header.is_empty() || row.contains_key(header) {
                continue;
            }
            let cell = raw.get(i).map(to_cell).unwrap_or_default();
            row.insert(header.clone(), cell);
        }
        sheet.rows.push(row);
        sheet.row_numbers.push(first_row + offset + 1);
    }

    sheet
}

fn is_blank(data: &Data) -> bool {
    match data {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;

    const POSICAO_XLS: &[u8] = include_bytes!("../../fixtures/posicao.xls");

    fn sample_xlsx() -> Vec<u8> {
        let mut wb = XlsxWorkbook::new();

        let ws = wb.add_worksheet();
        ws.set_name("Acoes").unwrap();
        ws.write_string(0, 0, "Produto").unwrap();
        ws.write_string(0, 1, " Quantidade ").unwrap();
        ws.write_string(0, 2, "Valor Atualizado").unwrap();
        ws.write_string(1, 0, "PETR4").unwrap();
        ws.write_number(1, 1, 100.0).unwrap();
        ws.write_number(1, 2, 2500.0).unwrap();
        // row 2 left blank on purpose
        ws.write_string(3, 0, "VALE3").unwrap();
        ws.write_string(3, 1, "50").unwrap();

        let ws = wb.add_worksheet();
        ws.set_name("Vazia").unwrap();

        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn test_detect_format_zip() {
        assert_eq!(detect_format(b"PK\x03\x04rest"), Some(ContainerFormat::Xlsx));
    }

    #[test]
    fn test_detect_format_cfb() {
        let mut bytes = CFB_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(detect_format(&bytes), Some(ContainerFormat::Xls));
    }

    #[test]
    fn test_detect_format_unknown() {
        assert_eq!(detect_format(b"Produto;Quantidade\nPETR4;100"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn test_unknown_signature_is_rejected() {
        let err = parse_bytes_auto(b"name,age\nAlice,30").unwrap_err();
        assert!(matches!(err, WorkbookError::UnknownFormat));
    }

    #[test]
    fn test_corrupt_zip_is_container_error() {
        let err = parse_bytes_auto(b"PK\x03\x04 definitely not a zip").unwrap_err();
        assert!(matches!(err, WorkbookError::Container(_)));
    }

    #[test]
    fn test_parse_xlsx_rows() {
        let result = parse_bytes_auto(&sample_xlsx()).unwrap();

        assert_eq!(result.format, ContainerFormat::Xlsx);
        assert_eq!(result.sheet_names, vec!["Acoes", "Vazia"]);

        let acoes = &result.workbook.sheets[0];
        assert_eq!(acoes.headers, vec!["Produto", "Quantidade", "Valor Atualizado"]);
        assert_eq!(acoes.rows.len(), 2);
        assert_eq!(acoes.rows[0]["Produto"], Cell::Text("PETR4".into()));
        assert_eq!(acoes.rows[0]["Quantidade"], Cell::Number(100.0));
        assert_eq!(acoes.rows[1]["Quantidade"], Cell::Text("50".into()));
        assert_eq!(acoes.rows[1]["Valor Atualizado"], Cell::Empty);
        assert_eq!(acoes.row_numbers, vec![2, 4]);
    }

    #[test]
    fn test_parse_xls_fixture() {
        assert_eq!(detect_format(POSICAO_XLS), Some(ContainerFormat::Xls));

        let result = parse_bytes_auto(POSICAO_XLS).unwrap();
        assert_eq!(result.format, ContainerFormat::Xls);
        assert_eq!(result.sheet_names, vec!["Acoes", "Renda Fixa"]);

        // Header sits on row 2, row 4 is blank
        let acoes = &result.workbook.sheets[0];
        assert_eq!(acoes.headers, vec!["Produto", "Quantidade", "Valor Atualizado"]);
        assert_eq!(acoes.rows.len(), 2);
        assert_eq!(acoes.rows[0]["Produto"], Cell::Text("PETR4".into()));
        assert_eq!(acoes.rows[0]["Valor Atualizado"], Cell::Number(2500.5));
        assert_eq!(acoes.rows[1]["Produto"], Cell::Empty);
        assert_eq!(acoes.row_numbers, vec![3, 5]);

        let renda_fixa = &result.workbook.sheets[1];
        assert_eq!(renda_fixa.rows[0]["Valor Atualizado CURVA"], Cell::Number(0.0));
        assert_eq!(renda_fixa.row_numbers, vec![2]);
    }

    #[test]
    fn test_empty_sheet_has_no_rows() {
        let result = parse_bytes_auto(&sample_xlsx()).unwrap();
        let vazia = &result.workbook.sheets[1];
        assert!(vazia.headers.is_empty());
        assert!(vazia.rows.is_empty());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posicao.xlsx");
        std::fs::write(&path, sample_xlsx()).unwrap();

        let result = parse_workbook_file(&path).unwrap();
        assert_eq!(result.workbook.row_count(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_workbook_file("/nonexistent/posicao.xlsx").unwrap_err();
        assert!(matches!(err, WorkbookError::Io(_)));
    }
}
