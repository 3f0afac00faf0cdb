//! Conversion of the assistant's Markdown-flavoured answers into blocks.
//!
//! Only the subset the chat prompt asks the model to use is recognised:
//! pipe tables, `*`/`-`/`+`/`1.` list items, `**bold**` and `*italic*`.
//! Every other line is a paragraph. The pass never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([*\-+]|\d+\.)\s+").expect("valid list marker pattern"));

static INLINE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(.*?)\*\*|\*(.*?)\*").expect("valid inline span pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Plain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentBlock {
    Paragraph {
        spans: Vec<Span>,
    },
    ListItem {
        ordered: bool,
        spans: Vec<Span>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl DocumentBlock {
    /// Text content with all styling and structure markers removed.
    pub fn plain_text(&self) -> String {
        match self {
            DocumentBlock::Paragraph { spans } | DocumentBlock::ListItem { spans, .. } => {
                spans.iter().map(|s| s.text.as_str()).collect()
            }
            DocumentBlock::Table { header, rows } => std::iter::once(header)
                .chain(rows.iter())
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// What the scanner does with the line under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningTable,
    ScanningList { ordered: bool, body_start: usize },
    ScanningParagraph,
}

/// Renders a response into blocks in source line order.
pub fn render(text: &str) -> Vec<DocumentBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while cursor < lines.len() {
        let line = lines[cursor];
        match scan_state(&lines, cursor) {
            ScanState::ScanningTable => {
                let (block, next) = scan_table(&lines, cursor);
                blocks.push(block);
                cursor = next;
            }
            ScanState::ScanningList {
                ordered,
                body_start,
            } => {
                blocks.push(DocumentBlock::ListItem {
                    ordered,
                    spans: parse_inline(&line[body_start..]),
                });
                cursor += 1;
            }
            ScanState::ScanningParagraph => {
                blocks.push(DocumentBlock::Paragraph {
                    spans: parse_inline(line),
                });
                cursor += 1;
            }
        }
    }

    blocks
}

fn scan_state(lines: &[&str], cursor: usize) -> ScanState {
    let line = lines[cursor];
    if starts_table(lines, cursor) {
        return ScanState::ScanningTable;
    }
    match LIST_MARKER.captures(line) {
        Some(caps) => ScanState::ScanningList {
            ordered: caps[1].ends_with('.'),
            body_start: caps.get(0).map_or(0, |m| m.end()),
        },
        None => ScanState::ScanningParagraph,
    }
}

/// A table starts at a pipe row that is immediately followed by a separator row.
fn starts_table(lines: &[&str], cursor: usize) -> bool {
    is_table_line(lines[cursor])
        && lines
            .get(cursor + 1)
            .is_some_and(|next| is_table_separator(next))
}

/// Consumes header, separator and data rows; returns the block and the next cursor.
fn scan_table(lines: &[&str], cursor: usize) -> (DocumentBlock, usize) {
    let header = parse_table_row(lines[cursor]);
    let mut next = cursor + 2;
    let mut rows = Vec::new();
    while next < lines.len() && is_table_line(lines[next]) {
        rows.push(parse_table_row(lines[next]));
        next += 1;
    }
    (DocumentBlock::Table { header, rows }, next)
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_table_separator(line: &str) -> bool {
    let trimmed = line.trim();
    if !is_table_line(trimmed) || trimmed.matches('|').count() < 2 {
        return false;
    }

    trimmed
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .all(|part| {
            let core = part.strip_prefix(':').unwrap_or(part);
            let core = core.strip_suffix(':').unwrap_or(core);
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

fn parse_table_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Splits a line into plain, bold and italic spans.
///
/// `**x**` wins over `*x*`. A delimiter pair with nothing inside, or a lone
/// delimiter, stays in the output as literal text.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut last = 0;

    for caps in INLINE_SPAN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_span(&mut spans, &text[last..whole.start()], SpanStyle::Plain);

        let (inner, style) = match (caps.get(1), caps.get(2)) {
            (Some(bold), _) => (bold.as_str(), SpanStyle::Bold),
            (None, Some(italic)) => (italic.as_str(), SpanStyle::Italic),
            (None, None) => (whole.as_str(), SpanStyle::Plain),
        };
        if inner.is_empty() {
            push_span(&mut spans, whole.as_str(), SpanStyle::Plain);
        } else {
            push_span(&mut spans, inner, style);
        }
        last = whole.end();
    }
    push_span(&mut spans, &text[last..], SpanStyle::Plain);

    spans
}

fn push_span(spans: &mut Vec<Span>, text: &str, style: SpanStyle) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(prev) if style == SpanStyle::Plain && prev.style == SpanStyle::Plain => {
            prev.text.push_str(text)
        }
        _ => spans.push(Span::new(text, style)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles(spans: &[Span]) -> Vec<SpanStyle> {
        spans.iter().map(|s| s.style).collect()
    }

    #[test]
    fn test_inline_bold_and_italic() {
        let blocks = render("**bold** and *italic* and plain");
        assert_eq!(
            blocks,
            vec![DocumentBlock::Paragraph {
                spans: vec![
                    Span::new("bold", SpanStyle::Bold),
                    Span::plain(" and "),
                    Span::new("italic", SpanStyle::Italic),
                    Span::plain(" and plain"),
                ]
            }]
        );
    }

    #[test]
    fn test_bold_takes_priority_over_italic() {
        let spans = parse_inline("a **b*c** d");
        assert_eq!(
            styles(&spans),
            vec![SpanStyle::Plain, SpanStyle::Bold, SpanStyle::Plain]
        );
        assert_eq!(spans[1].text, "b*c");
    }

    #[test]
    fn test_unbalanced_delimiters_stay_literal() {
        assert_eq!(parse_inline("**bold"), vec![Span::plain("**bold")]);
        assert_eq!(parse_inline("2 * 3 = 6"), vec![Span::plain("2 * 3 = 6")]);
        assert_eq!(parse_inline("a ** b"), vec![Span::plain("a ** b")]);
    }

    #[test]
    fn test_table_followed_by_blank_line() {
        let text = "| Item | 2023 |\n|:-----|-----:|\n| Cash | $10 |\n";
        let blocks = render(&format!("{text}\n"));
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            DocumentBlock::Table {
                header: vec!["Item".to_string(), "2023".to_string()],
                rows: vec![vec!["Cash".to_string(), "$10".to_string()]],
            }
        );
        assert_eq!(blocks[1], DocumentBlock::Paragraph { spans: vec![] });
    }

    #[test]
    fn test_table_without_data_rows() {
        let blocks = render("| A | B |\n| --- | --- |\nAfter");
        assert_eq!(
            blocks[0],
            DocumentBlock::Table {
                header: vec!["A".to_string(), "B".to_string()],
                rows: vec![],
            }
        );
        assert_eq!(blocks[1].plain_text(), "After");
    }

    #[test]
    fn test_pipe_line_without_separator_is_paragraph() {
        let blocks = render("| not | a table |\n| still | no |");
        assert_eq!(blocks.len(), 2);
        assert!(blocks
            .iter()
            .all(|b| matches!(b, DocumentBlock::Paragraph { .. })));
    }

    #[test]
    fn test_separator_rules() {
        assert!(is_table_separator("|---|:---:|---:|"));
        assert!(is_table_separator("| --- || --- |"));
        assert!(!is_table_separator("|"));
        assert!(!is_table_separator("| :: |"));
        assert!(!is_table_separator("| -x- |"));
        assert!(!is_table_separator("---"));
    }

    #[test]
    fn test_unordered_list_items() {
        let blocks = render("* item one\n* item two");
        assert_eq!(
            blocks,
            vec![
                DocumentBlock::ListItem {
                    ordered: false,
                    spans: vec![Span::plain("item one")]
                },
                DocumentBlock::ListItem {
                    ordered: false,
                    spans: vec![Span::plain("item two")]
                },
            ]
        );
    }

    #[test]
    fn test_ordered_and_nested_list_items() {
        let blocks = render("1. **First** point\n    - sub item\n+ plus");
        assert!(matches!(
            &blocks[0],
            DocumentBlock::ListItem { ordered: true, spans } if spans[0].style == SpanStyle::Bold
        ));
        assert!(matches!(
            &blocks[1],
            DocumentBlock::ListItem { ordered: false, .. }
        ));
        assert_eq!(blocks[1].plain_text(), "sub item");
        assert_eq!(blocks[2].plain_text(), "plus");
    }

    #[test]
    fn test_bold_heading_is_not_a_list() {
        let blocks = render("**Key Findings:**");
        assert_eq!(
            blocks,
            vec![DocumentBlock::Paragraph {
                spans: vec![Span::new("Key Findings:", SpanStyle::Bold)]
            }]
        );
    }

    #[test]
    fn test_plain_text_reconstructs_content() {
        let text = "Intro *note*\n- **Debt**: $5\n| A | B |\n|---|---|\n| 1 | 2 |\nEnd";
        let joined: Vec<String> = render(text).iter().map(DocumentBlock::plain_text).collect();
        assert_eq!(joined, vec!["Intro note", "Debt: $5", "A B\n1 2", "End"]);
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(render("").is_empty());
    }
}
