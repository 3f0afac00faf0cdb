//! Cleaning and width normalization of LLM-extracted tables.
//!
//! The extraction prompt asks the model to return every cell as a string so
//! that accounting formatting survives the trip (`"$1,234"`, `"(789)"`, `"—"`).
//! This module turns those string grids into typed rows that a spreadsheet
//! writer can emit as real numbers.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder row the model is told to emit when a statement is absent.
pub const TABLE_NOT_FOUND: &str = "Table Not Found";

const ACCOUNTING_DASHES: [&str; 3] = ["-", "\u{2013}", "\u{2014}"];

/// One cell exactly as the model returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCell {
    Missing,
    Number(f64),
    Text(String),
}

impl From<&Value> for RawCell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawCell::Missing,
            Value::String(s) => RawCell::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(v) => RawCell::Number(v),
                None => RawCell::Text(n.to_string()),
            },
            other => RawCell::Text(other.to_string()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl RawCell {
    /// Text used when the cell is a column name.
    pub fn as_header_text(&self) -> String {
        match self {
            RawCell::Missing => String::new(),
            RawCell::Number(n) => n.to_string(),
            RawCell::Text(s) => s.clone(),
        }
    }
}

/// A cell after cleaning, ready for a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Blank,
    /// Value that could not be read as a number, kept verbatim.
    Text(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// Display width used for column sizing.
    pub fn text_len(&self) -> usize {
        match self {
            CellValue::Number(n) => n.to_string().chars().count(),
            CellValue::Blank => 0,
            CellValue::Text(s) => s.chars().count(),
        }
    }
}

impl From<CellValue> for RawCell {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Number(n) => RawCell::Number(n),
            CellValue::Blank => RawCell::Missing,
            CellValue::Text(s) => RawCell::Text(s),
        }
    }
}

/// The extraction result for one requested statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawTable {
    /// Header row followed by data rows (possibly empty, possibly the sentinel).
    Grid(Vec<Vec<RawCell>>),
    /// The model returned something other than a list of lists.
    Malformed,
    /// The requested key was absent from the model's response.
    Missing,
}

impl RawTable {
    pub fn not_found() -> Self {
        RawTable::Grid(vec![vec![RawCell::from(TABLE_NOT_FOUND)]])
    }

    /// Builds a raw table from the JSON value stored under a table name.
    ///
    /// Rows that are not themselves lists are kept as empty rows so the
    /// data-row count still matches what the model produced.
    pub fn from_json(value: &Value) -> Self {
        let Value::Array(rows) = value else {
            return RawTable::Malformed;
        };

        match rows.first() {
            None => RawTable::Grid(Vec::new()),
            Some(Value::Array(_)) => RawTable::Grid(
                rows.iter()
                    .map(|row| match row {
                        Value::Array(cells) => cells.iter().map(RawCell::from).collect(),
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            Some(_) => RawTable::Malformed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            RawTable::Grid(rows) => {
                rows.len() == 1
                    && rows[0].len() == 1
                    && rows[0][0] == RawCell::Text(TABLE_NOT_FOUND.to_string())
            }
            _ => false,
        }
    }

    /// True when the model actually returned rows for this table.
    pub fn has_content(&self) -> bool {
        matches!(self, RawTable::Grid(rows) if !rows.is_empty()) && !self.is_not_found()
    }
}

/// Requested table name to raw extraction, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTableSet {
    entries: Vec<(String, RawTable)>,
}

impl RawTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a model response against the list of requested tables.
    ///
    /// Every requested name is present in the result: absent keys become
    /// [`RawTable::Missing`] and non-grid values [`RawTable::Malformed`].
    /// Keys the model invented are ignored.
    pub fn from_response(response: &Value, targets: &[String]) -> Self {
        let mut set = Self::new();
        for name in targets {
            let table = match response.get(name) {
                Some(value @ Value::Array(_)) => {
                    let table = RawTable::from_json(value);
                    if table == RawTable::Malformed {
                        warn!(
                            "Table '{}' has malformed data (expected list of lists)",
                            name
                        );
                    }
                    table
                }
                _ => {
                    warn!("Target table '{}' not found or not a list in LLM response", name);
                    RawTable::Missing
                }
            };
            set.insert(name.clone(), table);
        }
        set
    }

    /// Inserts or replaces a table, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((name, table)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawTable)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the tables for which the model returned real rows.
    pub fn extracted_names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, table)| table.has_content())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Why a raw table produced no sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Missing,
    Malformed,
    Empty,
    NotFound,
    EmptyHeader,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::Missing => "table missing from response",
            SkipReason::Malformed => "invalid structure",
            SkipReason::Empty => "no rows",
            SkipReason::NotFound => "table not found in document",
            SkipReason::EmptyHeader => "empty header",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl CleanedTable {
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

/// Coerces a single extracted cell into a spreadsheet value.
///
/// Strings are interpreted with accounting conventions: blanks and "n/a"
/// become empty cells, lone dashes are zero, parentheses mean negative,
/// and currency symbols and thousands separators are ignored. Anything that
/// still is not a number is returned as the original, untrimmed string.
pub fn clean_cell(cell: &RawCell) -> CellValue {
    match cell {
        RawCell::Missing => CellValue::Blank,
        RawCell::Number(n) => CellValue::Number(*n),
        RawCell::Text(text) => clean_text(text),
    }
}

fn clean_text(original: &str) -> CellValue {
    let trimmed = original.trim();
    let lowered = trimmed.to_lowercase();
    if trimmed.is_empty() || lowered == "n/a" || lowered == "not applicable" {
        return CellValue::Blank;
    }

    if ACCOUNTING_DASHES.contains(&trimmed) {
        return CellValue::Number(0.0);
    }

    let signed = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => format!("-{}", inner),
        None => trimmed.to_string(),
    };

    let digits: String = signed
        .chars()
        .filter(|c| !matches!(c, '$' | '\u{20ac}' | ','))
        .collect();

    match digits.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => CellValue::Number(value),
        _ => CellValue::Text(original.to_string()),
    }
}

/// Validates a raw table and produces width-normalized, cleaned rows.
///
/// Each data row is padded with blanks or truncated to the header width
/// before any cell is cleaned. Rows are never dropped.
pub fn normalize_table(raw: &RawTable, name: &str) -> Result<CleanedTable, SkipReason> {
    let rows = match raw {
        RawTable::Missing => return Err(SkipReason::Missing),
        RawTable::Malformed => return Err(SkipReason::Malformed),
        RawTable::Grid(rows) if rows.is_empty() => return Err(SkipReason::Empty),
        RawTable::Grid(_) if raw.is_not_found() => return Err(SkipReason::NotFound),
        RawTable::Grid(rows) => rows,
    };

    let header: Vec<String> = rows[0].iter().map(RawCell::as_header_text).collect();
    if header.is_empty() {
        return Err(SkipReason::EmptyHeader);
    }
    let width = header.len();

    let cleaned_rows: Vec<Vec<CellValue>> = rows[1..]
        .iter()
        .map(|row| {
            let mut cells: Vec<RawCell> = row.iter().take(width).cloned().collect();
            cells.resize(width, RawCell::Text(String::new()));
            cells.iter().map(clean_cell).collect()
        })
        .collect();

    debug!(
        "Normalized table '{}': {} columns, {} data rows",
        name,
        width,
        cleaned_rows.len()
    );

    Ok(CleanedTable {
        header,
        rows: cleaned_rows,
    })
}
