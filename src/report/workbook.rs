use crate::error::Result;
use crate::table::{normalize_table, CellValue, CleanedTable, RawTableSet};
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const NUMBER_FORMAT: &str = "#,##0";

/// Reduces a table name to characters Excel accepts in a sheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let filtered: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    filtered.trim().chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Hands out unique sheet names for one workbook.
///
/// The first table keeps its sanitized name. Later tables that collide
/// (Excel compares case-insensitively) get a ` 2`, ` 3`, ... suffix, with the
/// base shortened so the result stays within the length limit.
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, table_name: &str) -> String {
        let mut base = sanitize_sheet_name(table_name);
        if base.is_empty() {
            base = format!("Sheet{}", self.used.len() + 1);
        }

        let mut candidate = base.clone();
        let mut counter = 2;
        while self.used.contains(&candidate.to_lowercase()) {
            let suffix = format!(" {}", counter);
            let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
            let stem: String = base.chars().take(keep).collect();
            candidate = format!("{}{}", stem.trim_end(), suffix);
            counter += 1;
        }

        self.used.insert(candidate.to_lowercase());
        candidate
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkbookOutcome {
    Written { path: PathBuf, sheets: Vec<String> },
    /// No table survived normalization, so no file was created.
    Empty,
}

/// Normalizes every extracted table and writes the survivors as sheets.
///
/// Tables that are skipped or have no data rows are logged and left out.
pub fn write_workbook(path: &Path, tables: &RawTableSet, source_name: &str) -> Result<WorkbookOutcome> {
    let mut namer = SheetNamer::new();
    let mut sheets: Vec<(String, CleanedTable)> = Vec::new();

    for (name, raw) in tables.iter() {
        let table = match normalize_table(raw, name) {
            Ok(table) => table,
            Err(reason) => {
                warn!(
                    "Skipping table '{}' from {} ({})",
                    name, source_name, reason
                );
                continue;
            }
        };
        if table.rows.is_empty() {
            warn!(
                "No valid data rows found for table '{}' from {} after processing",
                name, source_name
            );
            continue;
        }
        sheets.push((namer.assign(name), table));
    }

    if sheets.is_empty() {
        warn!(
            "No valid tables could be processed for {}. No Excel file will be created.",
            source_name
        );
        return Ok(WorkbookOutcome::Empty);
    }

    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_num_format(NUMBER_FORMAT);
    let mut workbook = Workbook::new();

    for (sheet_name, table) in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        write_sheet(worksheet, table, &header_format, &number_format)?;
    }

    workbook.save(path)?;
    info!(
        "Successfully wrote and formatted {} sheet(s) to {}",
        sheets.len(),
        path.display()
    );

    Ok(WorkbookOutcome::Written {
        path: path.to_path_buf(),
        sheets: sheets.into_iter().map(|(name, _)| name).collect(),
    })
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &CleanedTable,
    header_format: &Format,
    number_format: &Format,
) -> Result<()> {
    for (col, title) in table.header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title, header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                CellValue::Number(value) => {
                    worksheet.write_number_with_format(row_num, col as u16, *value, number_format)?;
                }
                CellValue::Text(text) => {
                    worksheet.write_string(row_num, col as u16, text)?;
                }
                CellValue::Blank => {}
            }
        }
    }

    for (col, width) in column_widths(table).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// Longest rendered value per column plus padding.
fn column_widths(table: &CleanedTable) -> Vec<usize> {
    table
        .header
        .iter()
        .enumerate()
        .map(|(col, title)| {
            let longest_cell = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(CellValue::text_len)
                .max()
                .unwrap_or(0);
            title.chars().count().max(longest_cell) + 2
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawCell, RawTable};

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(
            sanitize_sheet_name("CONSOLIDATED STATEMENTS OF CASH FLOWS"),
            "CONSOLIDATED STATEMENTS OF CASH"
        );
        assert_eq!(sanitize_sheet_name("  Balance/Sheet (2023) "), "BalanceSheet 2023");
        assert_eq!(sanitize_sheet_name("***"), "");
    }

    #[test]
    fn test_sheet_namer_suffixes_collisions() {
        let mut namer = SheetNamer::new();
        let first = namer.assign("CONSOLIDATED STATEMENTS OF CASH FLOWS");
        let second = namer.assign("CONSOLIDATED STATEMENTS OF CASH FLOWS (restated)");
        let third = namer.assign("consolidated statements of cash flows");

        assert_eq!(first.chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(second, "CONSOLIDATED STATEMENTS OF CA 2");
        assert_eq!(third, "consolidated statements of ca 3");
        assert!(second.chars().count() <= MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn test_sheet_namer_fills_empty_names() {
        let mut namer = SheetNamer::new();
        namer.assign("Income");
        assert_eq!(namer.assign("!!!"), "Sheet2");
    }

    #[test]
    fn test_column_widths() {
        let table = CleanedTable {
            header: vec!["Item".to_string(), "2023".to_string()],
            rows: vec![vec![
                CellValue::Text("Total revenue".to_string()),
                CellValue::Number(1500.0),
            ]],
        };
        assert_eq!(column_widths(&table), vec![15, 6]);
    }

    #[test]
    fn test_empty_workbook_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let mut tables = RawTableSet::new();
        tables.insert("A", RawTable::not_found());
        tables.insert("B", RawTable::Grid(vec![vec![RawCell::from("Header")]]));

        let outcome = write_workbook(&path, &tables, "empty.pdf").unwrap();
        assert_eq!(outcome, WorkbookOutcome::Empty);
        assert!(!path.exists());
    }
}
