//! Spreadsheet Emission
//!
//! Serializes rows into a one-sheet xlsx workbook. Column names are applied
//! here, from the configured [`ColumnScheme`].

use base64::Engine;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::models::Row;
use crate::types::AppResult;

/// MIME type of the produced workbook
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest text an xlsx cell accepts, in characters
pub const MAX_CELL_CHARS: usize = 32_767;

/// Header names written above the two columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnScheme {
    /// "Field Name" / "Field Value"
    #[default]
    FieldValue,
    /// "Category" / "Details"
    CategoryDetails,
}

impl ColumnScheme {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "field" | "field_value" => Some(ColumnScheme::FieldValue),
            "category" | "category_details" => Some(ColumnScheme::CategoryDetails),
            _ => None,
        }
    }

    pub fn headers(&self) -> (&'static str, &'static str) {
        match self {
            ColumnScheme::FieldValue => ("Field Name", "Field Value"),
            ColumnScheme::CategoryDetails => ("Category", "Details"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub sheet_name: String,
    pub columns: ColumnScheme,
    pub label_width: f64,
    pub value_width: f64,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            sheet_name: "Contract Analysis".to_string(),
            columns: ColumnScheme::FieldValue,
            label_width: 30.0,
            value_width: 50.0,
        }
    }
}

impl From<&crate::config::OutputConfig> for SheetLayout {
    fn from(output: &crate::config::OutputConfig) -> Self {
        Self {
            sheet_name: output.sheet_name.clone(),
            columns: output.columns,
            ..Self::default()
        }
    }
}

/// Encode `rows` as an xlsx workbook: header row, then one row per [`Row`].
///
/// A value longer than [`MAX_CELL_CHARS`] continues on the following rows with
/// an empty label; an overlong label is truncated.
pub fn encode_workbook(rows: &[Row], layout: &SheetLayout) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let wrap_format = Format::new().set_text_wrap();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&layout.sheet_name)?;
    worksheet.set_column_width(0, layout.label_width)?;
    worksheet.set_column_width(1, layout.value_width)?;

    let (label_header, value_header) = layout.columns.headers();
    worksheet.write_string_with_format(0, 0, label_header, &header_format)?;
    worksheet.write_string_with_format(0, 1, value_header, &header_format)?;

    let mut line: u32 = 1;
    for row in rows {
        // Empty cells stay blank
        if !row.label.is_empty() {
            let label = split_cell_text(&row.label).next().unwrap_or_default();
            worksheet.write_string(line, 0, label)?;
        }
        if row.value.is_empty() {
            line += 1;
            continue;
        }
        for part in split_cell_text(&row.value) {
            worksheet.write_string_with_format(line, 1, part, &wrap_format)?;
            line += 1;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Split `text` into pieces of at most [`MAX_CELL_CHARS`] characters.
fn split_cell_text(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(MAX_CELL_CHARS)
            .map(|(at, _)| at)
            .unwrap_or(rest.len());
        let (piece, tail) = rest.split_at(end);
        rest = tail;
        Some(piece)
    })
}

pub fn to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// `<basename>_analysis_<unix-millis>.xlsx` for an uploaded file name.
pub fn output_filename(original: &str, at: DateTime<Utc>) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => base,
    };

    let safe: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('.');
    let safe = if safe.is_empty() { "document" } else { safe };

    format!("{}_analysis_{}.xlsx", safe, at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx};
    use chrono::TimeZone;
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>, sheet: &str) -> Vec<Vec<String>> {
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(sheet).unwrap();
        range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| match cell {
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_rows() {
        let rows = vec![
            Row::new("Customer Name", "Acme Corp"),
            Row::header("Payment"),
            Row::new("Billing Rate", "$100/hour"),
            Row::detail("Invoices are due within 30 days"),
        ];

        let bytes = encode_workbook(&rows, &SheetLayout::default()).unwrap();
        let table = read_back(bytes, "Contract Analysis");

        assert_eq!(table[0], vec!["Field Name", "Field Value"]);
        assert_eq!(table.len(), rows.len() + 1);
        for (row, cells) in rows.iter().zip(&table[1..]) {
            assert_eq!(cells[0], row.label);
            assert_eq!(cells[1], row.value);
        }
    }

    #[test]
    fn test_long_raw_output_spills_onto_following_rows() {
        let text = "x".repeat(40_000);
        let rows = crate::parser::parse_rows(&text);
        let bytes = encode_workbook(&rows, &SheetLayout::default()).unwrap();
        let table = read_back(bytes, "Contract Analysis");

        assert_eq!(table.len(), 3);
        assert_eq!(table[1][0], "Raw Output");
        assert_eq!(table[1][1].chars().count(), MAX_CELL_CHARS);
        assert_eq!(table[2][0], "");
        assert_eq!(table[2][1].chars().count(), 40_000 - MAX_CELL_CHARS);
        assert_eq!(format!("{}{}", table[1][1], table[2][1]), text);
    }

    #[test]
    fn test_overlong_label_is_truncated() {
        let label = "é".repeat(MAX_CELL_CHARS + 10);
        let bytes = encode_workbook(&[Row::new(label, "v")], &SheetLayout::default()).unwrap();
        let table = read_back(bytes, "Contract Analysis");
        assert_eq!(table[1][0].chars().count(), MAX_CELL_CHARS);
        assert_eq!(table[1][1], "v");
    }

    #[test]
    fn test_split_cell_text_respects_char_boundaries() {
        let text = format!("{}€€", "a".repeat(MAX_CELL_CHARS - 1));
        let parts: Vec<&str> = split_cell_text(&text).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with('€'));
        assert_eq!(parts[1], "€");
        assert_eq!(split_cell_text("").count(), 0);
    }

    #[test]
    fn test_category_scheme_and_sheet_name() {
        let layout = SheetLayout {
            sheet_name: "Contract Summary".to_string(),
            columns: ColumnScheme::CategoryDetails,
            ..SheetLayout::default()
        };
        let bytes = encode_workbook(&[Row::new("Term", "12 months")], &layout).unwrap();
        let table = read_back(bytes, "Contract Summary");
        assert_eq!(table[0], vec!["Category", "Details"]);
        assert_eq!(table[1], vec!["Term", "12 months"]);
    }

    #[test]
    fn test_invalid_sheet_name_is_an_error() {
        let layout = SheetLayout {
            sheet_name: "Bad[Name]".to_string(),
            ..SheetLayout::default()
        };
        assert!(encode_workbook(&[Row::new("a", "b")], &layout).is_err());
    }

    #[test]
    fn test_base64_payload_is_a_zip_container() {
        let bytes = encode_workbook(&[Row::new("a", "b")], &SheetLayout::default()).unwrap();
        let encoded = to_base64(&bytes);
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&decoded[..2], b"PK");
    }

    #[test]
    fn test_output_filename() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(output_filename("lease.pdf", at), "lease_analysis_1700000000123.xlsx");
        assert_eq!(
            output_filename("master.services.agreement.docx", at),
            "master.services.agreement_analysis_1700000000123.xlsx"
        );
        assert_eq!(output_filename("../../etc/passwd", at), "passwd_analysis_1700000000123.xlsx");
        assert_eq!(output_filename("C:\\docs\\nda.txt", at), "nda_analysis_1700000000123.xlsx");
        assert_eq!(output_filename("", at), "document_analysis_1700000000123.xlsx");
        assert_eq!(output_filename("..", at), "document_analysis_1700000000123.xlsx");
        assert_eq!(output_filename("a<b>.pdf", at), "a_b__analysis_1700000000123.xlsx");
    }

    #[test]
    fn test_column_scheme_ids() {
        assert_eq!(ColumnScheme::from_id("field"), Some(ColumnScheme::FieldValue));
        assert_eq!(ColumnScheme::from_id("Category"), Some(ColumnScheme::CategoryDetails));
        assert_eq!(ColumnScheme::from_id("rows"), None);
    }
}
