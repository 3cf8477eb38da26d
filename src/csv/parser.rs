//! Header-indexed CSV parsing with injection sanitizing (spec §4.4.1, C7).

use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Cells starting with one of these trigger spreadsheet formula injection
/// and get a leading apostrophe prepended (spec §8 invariant 6).
const INJECTION_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];

pub fn sanitize_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.chars().next() {
        Some(c) if INJECTION_TRIGGERS.contains(&c) => format!("'{trimmed}"),
        _ => trimmed.to_string(),
    }
}

/// One data row (1-based, header occupies row 1 so the first data row is 2).
#[derive(Clone, Debug)]
pub struct CsvRow {
    pub row_number: u32,
    fields: Vec<String>,
    header_index: std::rc::Rc<HashMap<String, usize>>,
}

impl CsvRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = *self.header_index.get(column)?;
        self.fields.get(idx).map(|s| s.as_str())
    }

    /// Same as `get`, but an empty or whitespace-only cell is treated as
    /// absent, matching how required-field checks read CSV input.
    pub fn get_non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|s| !s.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct ParsedCsv {
    rows: Vec<CsvRow>,
}

impl ParsedCsv {
    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    /// Number of non-header records (spec §4.4.1 `CountRows`).
    pub fn count_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Parses UTF-8 RFC4180 CSV bytes. Header names are lower-cased and
/// trimmed; unknown columns are ignored. Fails if any of `required_columns`
/// is missing from the header (spec §4.4.1).
pub fn parse(bytes: &[u8], required_columns: &[&str]) -> AppResult<ParsedCsv> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header = reader
        .headers()
        .map_err(|e| AppError::validation(format!("CSVヘッダーを読み取れませんでした: {e}")))?
        .clone();

    let mut header_index = HashMap::new();
    for (idx, name) in header.iter().enumerate() {
        header_index.insert(name.trim().to_lowercase(), idx);
    }

    for required in required_columns {
        if !header_index.contains_key(*required) {
            return Err(AppError::validation(format!(
                "必須の列がありません: {required}"
            )));
        }
    }
    let header_index = std::rc::Rc::new(header_index);

    let mut rows = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AppError::validation(format!("CSV行の形式が不正です: {e}")))?;
        let fields = record.iter().map(sanitize_cell).collect();
        rows.push(CsvRow {
            row_number: (offset as u32) + 2,
            fields,
            header_index: header_index.clone(),
        });
    }

    Ok(ParsedCsv { rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_formula_injection_triggers_exactly_once() {
        assert_eq!(sanitize_cell("=SUM(A1:A2)"), "'=SUM(A1:A2)");
        assert_eq!(sanitize_cell("+1"), "'+1");
        assert_eq!(sanitize_cell("-1"), "'-1");
        assert_eq!(sanitize_cell("@mention"), "'@mention");
        assert_eq!(sanitize_cell("plain"), "plain");
        // already-sanitized input is left alone (idempotent)
        assert_eq!(sanitize_cell("'=SUM(A1:A2)"), "'=SUM(A1:A2)");
    }

    #[test]
    fn header_is_normalized_and_row_numbers_start_at_two() {
        let csv = "Date,Member_Name\n2025-01-15,Taro\n2025-01-16,Jiro\n";
        let parsed = parse(csv.as_bytes(), &["date", "member_name"]).unwrap();
        assert_eq!(parsed.count_rows(), 2);
        assert_eq!(parsed.rows()[0].row_number, 2);
        assert_eq!(parsed.rows()[0].get("date"), Some("2025-01-15"));
        assert_eq!(parsed.rows()[1].row_number, 3);
    }

    #[test]
    fn missing_required_column_fails_parse() {
        let csv = "name\nTaro\n";
        let err = parse(csv.as_bytes(), &["date", "member_name"]).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let csv = "name,extra\nTaro,whatever\n";
        let parsed = parse(csv.as_bytes(), &["name"]).unwrap();
        assert_eq!(parsed.rows()[0].get("name"), Some("Taro"));
    }
}
