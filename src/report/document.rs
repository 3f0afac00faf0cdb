use crate::error::{FinChatError, Result};
use crate::markdown::{DocumentBlock, Span, SpanStyle};
use crate::transcript::{ExtractionLogEntry, Transcript};
use chrono::Local;
use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelOverride, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Run, SpecialIndentType, Start, Style,
    StyleType, Table, TableCell, TableRow,
};
use log::info;
use std::fs::File;
use std::path::Path;

const USER_QUERY_COLOR: &str = "C00000";
const BULLET_NUMBERING: usize = 1;
const DECIMAL_ABSTRACT: usize = 2;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Thin builder over `docx_rs::Docx` for the blocks the assistant produces.
///
/// Each run of consecutive numbered items gets its own numbering instance so
/// that lists restart at 1 after any other block.
pub struct DocumentBuilder {
    docx: Docx,
    next_numbering_id: usize,
    open_numbering: Option<usize>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let docx = Docx::new()
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_style(
                Style::new("Heading2", StyleType::Paragraph)
                    .name("Heading 2")
                    .size(26)
                    .bold(),
            )
            .add_abstract_numbering(
                AbstractNumbering::new(BULLET_NUMBERING).add_level(
                    Level::new(
                        0,
                        Start::new(1),
                        NumberFormat::new("bullet"),
                        LevelText::new("\u{2022}"),
                        LevelJc::new("left"),
                    )
                    .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
                ),
            )
            .add_abstract_numbering(
                AbstractNumbering::new(DECIMAL_ABSTRACT).add_level(
                    Level::new(
                        0,
                        Start::new(1),
                        NumberFormat::new("decimal"),
                        LevelText::new("%1."),
                        LevelJc::new("left"),
                    )
                    .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
                ),
            )
            .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

        Self {
            docx,
            next_numbering_id: DECIMAL_ABSTRACT,
            open_numbering: None,
        }
    }

    pub fn heading(&mut self, text: &str, level: u8) -> &mut Self {
        let style = if level <= 1 { "Heading1" } else { "Heading2" };
        self.push(Paragraph::new().style(style).add_run(Run::new().add_text(text)))
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.push(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    /// A paragraph with a bold label followed by plain text.
    pub fn labelled(&mut self, label: &str, value: &str) -> &mut Self {
        self.push(
            Paragraph::new()
                .add_run(Run::new().add_text(label).bold())
                .add_run(Run::new().add_text(value)),
        )
    }

    pub fn block(&mut self, block: &DocumentBlock) -> &mut Self {
        match block {
            DocumentBlock::Paragraph { spans } => self.push(styled_paragraph(spans)),
            DocumentBlock::ListItem {
                ordered: false,
                spans,
            } => self.push(
                styled_paragraph(spans)
                    .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
            ),
            DocumentBlock::ListItem {
                ordered: true,
                spans,
            } => {
                let id = self.ordered_numbering();
                let paragraph =
                    styled_paragraph(spans).numbering(NumberingId::new(id), IndentLevel::new(0));
                self.update(|docx| docx.add_paragraph(paragraph))
            }
            DocumentBlock::Table { header, rows } => self.table(header, rows),
        }
    }

    /// Adds a bordered table whose width follows the header; short rows are
    /// padded and long rows truncated.
    pub fn table(&mut self, header: &[String], rows: &[Vec<String>]) -> &mut Self {
        self.open_numbering = None;
        let width = header.len();
        if width == 0 {
            return self;
        }

        let mut table_rows = vec![TableRow::new(
            header.iter().map(|title| table_cell(title, true)).collect(),
        )];
        for row in rows {
            let cells = (0..width)
                .map(|col| table_cell(row.get(col).map_or("", String::as_str), false))
                .collect();
            table_rows.push(TableRow::new(cells));
        }

        self.update(|docx| docx.add_table(Table::new(table_rows)))
    }

    pub fn save(self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.docx
            .build()
            .pack(file)
            .map_err(|e| FinChatError::Document(e.to_string()))?;
        Ok(())
    }

    fn push(&mut self, paragraph: Paragraph) -> &mut Self {
        self.open_numbering = None;
        self.update(|docx| docx.add_paragraph(paragraph))
    }

    fn update(&mut self, f: impl FnOnce(Docx) -> Docx) -> &mut Self {
        let docx = std::mem::replace(&mut self.docx, Docx::new());
        self.docx = f(docx);
        self
    }

    fn ordered_numbering(&mut self) -> usize {
        if let Some(id) = self.open_numbering {
            return id;
        }
        let id = self.next_numbering_id;
        self.next_numbering_id += 1;
        self.update(|docx| {
            docx.add_numbering(
                Numbering::new(id, DECIMAL_ABSTRACT).add_override(LevelOverride::new(0).start(1)),
            )
        });
        self.open_numbering = Some(id);
        id
    }
}

fn styled_paragraph(spans: &[Span]) -> Paragraph {
    spans.iter().fold(Paragraph::new(), |paragraph, span| {
        let run = Run::new().add_text(&span.text);
        let run = match span.style {
            SpanStyle::Plain => run,
            SpanStyle::Bold => run.bold(),
            SpanStyle::Italic => run.italic(),
        };
        paragraph.add_run(run)
    })
}

fn table_cell(text: &str, bold: bool) -> TableCell {
    let run = Run::new().add_text(text);
    let run = if bold { run.bold() } else { run };
    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
}

/// Writes the chat transcript, rendering each response's Markdown.
pub fn write_transcript(transcript: &Transcript, path: &Path) -> Result<()> {
    let mut doc = DocumentBuilder::new();
    doc.heading("Chatbot Session Transcript", 1)
        .text(&format!("Date: {}", Local::now().format(TIMESTAMP_FORMAT)));

    let context = if transcript.documents().is_empty() {
        "None".to_string()
    } else {
        transcript.documents().join(", ")
    };
    doc.text(&format!("Context PDF(s) Loaded: {}", context))
        .text(&"-".repeat(30));

    for turn in transcript.render() {
        doc.push(
            Paragraph::new()
                .add_run(Run::new().add_text("User: ").bold())
                .add_run(Run::new().add_text(&turn.query).color(USER_QUERY_COLOR)),
        );
        doc.push(Paragraph::new().add_run(Run::new().add_text("Chatbot:").bold()));
        for block in &turn.blocks {
            doc.block(block);
        }
        doc.push(Paragraph::new());
    }

    doc.save(path)?;
    info!("Chat transcript successfully saved to {}", path.display());
    Ok(())
}

/// Writes the per-PDF summary of a table extraction run.
pub fn write_extraction_log(entries: &[ExtractionLogEntry], path: &Path) -> Result<()> {
    let mut doc = DocumentBuilder::new();
    doc.heading("PDF Table Extraction Log", 1)
        .text(&format!(
            "Report generated on: {}",
            Local::now().format(TIMESTAMP_FORMAT)
        ))
        .text(&"-".repeat(30));

    if entries.is_empty() {
        doc.text("No PDF files were processed.");
    }

    for entry in entries {
        let tables = if entry.extracted_tables.is_empty() {
            "None.".to_string()
        } else {
            entry.extracted_tables.join(", ")
        };
        doc.heading(&format!("File: {}", entry.pdf_filename), 2)
            .labelled("Status: ", &entry.status.to_string())
            .labelled(
                "Processing Time: ",
                &format!("{:.2} seconds", entry.processing_time_seconds),
            )
            .labelled("Details: ", &entry.message)
            .labelled("Attempted/Extracted Tables: ", &tables)
            .text(&"-".repeat(20));
    }

    doc.save(path)?;
    info!("Extraction log saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::render;
    use crate::transcript::ChatTurn;

    fn is_zip(path: &Path) -> bool {
        std::fs::read(path)
            .map(|bytes| bytes.starts_with(b"PK"))
            .unwrap_or(false)
    }

    #[test]
    fn test_ordered_runs_get_fresh_numbering() {
        let mut doc = DocumentBuilder::new();
        for block in render("1. a\n2. b\ntext\n1. c") {
            doc.block(&block);
        }
        assert_eq!(doc.next_numbering_id, DECIMAL_ABSTRACT + 2);
    }

    #[test]
    fn test_bullets_do_not_allocate_numbering() {
        let mut doc = DocumentBuilder::new();
        for block in render("* a\n- b") {
            doc.block(&block);
        }
        assert_eq!(doc.next_numbering_id, DECIMAL_ABSTRACT);
        assert!(doc.open_numbering.is_none());
    }

    #[test]
    fn test_write_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.docx");
        let mut transcript = Transcript::new(vec!["2023.pdf".to_string()]);
        transcript.push(ChatTurn::new(
            "Total debt?",
            "**Key Findings:**\n* Debt: $5\n| A | B |\n|---|---|\n| 1 |\n1. first",
        ));

        write_transcript(&transcript, &path).unwrap();
        assert!(is_zip(&path));
    }

    #[test]
    fn test_write_extraction_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.docx");
        let entries = vec![
            ExtractionLogEntry::completed("a.pdf", 3.25, "Saved", vec!["X".to_string()]),
            ExtractionLogEntry::failure("b.pdf", 0.1, "upload failed"),
        ];

        write_extraction_log(&entries, &path).unwrap();
        assert!(is_zip(&path));

        let empty = dir.path().join("empty.docx");
        write_extraction_log(&[], &empty).unwrap();
        assert!(is_zip(&empty));
    }
}
