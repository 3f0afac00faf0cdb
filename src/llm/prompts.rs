// Prompts for table extraction and document chat

use crate::llm::types::RemoteDocument;
use crate::table::TABLE_NOT_FOUND;

pub const SYSTEM_PROMPT_TABLE_EXTRACT: &str = r#"
You are an expert financial data analyst specializing in extracting tables from corporate financial statements.

## YOUR MISSION
Locate each requested statement in the attached PDF and reproduce it as a grid of cells.

## RULES
1. Extract every row and column of each target table, including tables that span several pages.
2. Include footnotes that are part of the table structure or clearly attached to it.
3. Accept minor variations in titles (e.g. "Consolidated Statement of Operations" for "CONSOLIDATED STATEMENTS OF OPERATIONS") when the content clearly matches, and store the table under the requested name.
4. Financial concepts may be described in different words; match tables by content, not just by title.
5. Keep every value as a STRING exactly as printed, e.g. "$1,234.56" or "(789)". Never convert values to numbers.

## OUTPUT FORMAT
Return a single JSON object:
- One key per requested table name, spelled exactly as requested.
- Each value is a list of lists: the first inner list is the header row, the following inner lists are data rows.
- If a table is not in the document, keep its key and set its value to [["Table Not Found"]].
"#;

pub const SYSTEM_PROMPT_ANALYST: &str = r#"
You are an expert financial analyst assistant. Your knowledge is strictly limited to the content of the attached PDF document(s). Do not use external knowledge or make assumptions.
"#;

const CHAT_RESPONSE_GUIDE: &str = r#"
Summarize the information found throughout the ENTIRE content of the referenced document(s) that answers the question: narrative sections, discussions, notes and tables alike.

## RESPONSE STRUCTURE
* **Key Findings:** If the question asks for specific figures, list only those figures with their units or currency as printed (e.g. "Total Debt: $1,234,567"). Otherwise give a brief direct answer. If the information is not in the documents, say so here.
* **Details:** Breakdowns, context and supporting data points. Use bullet points for lists.
* **Citations:** The source of every specific figure or quote, e.g. "(Source: filename.pdf, Page X, Table: CONSOLIDATED BALANCE SHEETS)". For information drawn from narrative spread across a document, cite the document as a whole.

## INTERPRETATION
Read financial concepts broadly. For "liabilities", also consider debt, debt obligations, long-term and short-term debt, notes payable, lines of credit, credit facilities and their maturities or repayment schedules. Apply the same breadth to other concepts.
If the question is ambiguous, answer the most reasonable interpretation first, then ask for clarification.

## FORMATTING
* Use **bold text** and *italic text* for emphasis.
* Use `* Item` bullet points for lists and `***Sub-Topic***` for sub-headings inside Details.
* Present tabular data as a simple pipe table, every cell between pipes:
| Header 1 | Header 2 |
|----------|----------|
| Row1Col1 | Row1Col2 |
* Place citations for a table immediately after the table.
* Be concise and get directly to the point.
"#;

/// User instructions for extracting `targets` from one uploaded PDF.
pub fn table_extraction_prompt(document: &RemoteDocument, targets: &[String]) -> String {
    let names = targets
        .iter()
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the provided PDF document: \"{}\".\n\
        Extract the full content of the following tables: {}\n\n\
        Example of the expected JSON structure:\n\
        {{\n  \"CONSOLIDATED STATEMENTS OF OPERATIONS\": [\n    [\"Revenue\", \"2023\", \"2022\"],\n    \
        [\"Product Sales\", \"$1,000,000\", \"$900,000\"],\n    \
        [\"Cost of Revenue\", \"($800,000)\", \"($700,000)\"]\n  ],\n  \
        \"CONSOLIDATED BALANCE SHEETS\": [[\"{}\"]]\n}}",
        document.display_name, names, TABLE_NOT_FOUND
    )
}

/// The question together with a manifest of the documents it is asked against.
pub fn chat_prompt(query: &str, documents: &[RemoteDocument]) -> String {
    let references = documents
        .iter()
        .map(|doc| format!("- \"{}\" (File ID: {})", doc.display_name, doc.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "### DOCUMENTS\n{}\n\n### QUESTION\n\"{}\"\n{}",
        references, query, CHAT_RESPONSE_GUIDE
    )
}
