//! # finchat
//!
//! An assistant for company financial statements: it extracts the primary
//! statement tables from PDFs with Gemini, exports them to Excel workbooks,
//! and answers questions about the documents, saving transcripts as Word files.
//!
//! ## Core Passes
//!
//! - **Table normalization** ([`table`]): string grids returned by the model
//!   become width-normalized rows of numbers, blanks and residual text.
//! - **Markdown rendering** ([`markdown`]): the model's Markdown answers become
//!   paragraphs, list items and tables for the transcript document.
//!
//! Both passes are pure and never fail on textual input.
//!
//! ## Example
//!
//! ```rust
//! use finchat::{clean_cell, normalize_table, render, CellValue, DocumentBlock, RawCell, RawTable};
//!
//! assert_eq!(clean_cell(&RawCell::from("(1,234)")), CellValue::Number(-1234.0));
//!
//! let raw = RawTable::Grid(vec![
//!     vec![RawCell::from("Item"), RawCell::from("2023")],
//!     vec![RawCell::from("Cash"), RawCell::from("$1,500")],
//! ]);
//! let table = normalize_table(&raw, "CONSOLIDATED BALANCE SHEETS").unwrap();
//! assert_eq!(table.rows[0][1], CellValue::Number(1500.0));
//!
//! let blocks = render("* **Total debt:** $5m");
//! assert!(matches!(blocks[0], DocumentBlock::ListItem { ordered: false, .. }));
//! ```

pub mod config;
pub mod error;
pub mod markdown;
pub mod report;
pub mod table;
pub mod transcript;

#[cfg(feature = "gemini")]
pub mod llm;

#[cfg(feature = "cli")]
pub mod session;

pub use config::{load_api_key, PresetCategory, Settings};
pub use error::{FinChatError, Result};
pub use markdown::{parse_inline, render, DocumentBlock, Span, SpanStyle};
pub use report::{
    sanitize_sheet_name, write_extraction_log, write_transcript, write_workbook, SheetNamer,
    WorkbookOutcome,
};
pub use table::{
    clean_cell, normalize_table, CellValue, CleanedTable, RawCell, RawTable, RawTableSet,
    SkipReason,
};
pub use transcript::{ChatTurn, ExtractionLogEntry, ExtractionStatus, Transcript};
