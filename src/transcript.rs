use crate::markdown::{render, DocumentBlock};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    query: String,
    response: String,
}

impl ChatTurn {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
        }
    }

    /// A turn produced by the preset question run, labelled with its category.
    pub fn preset(category: &str, number: usize, question: &str, response: impl Into<String>) -> Self {
        Self::new(
            format!("Preset Question ({} - {}): {}", category, number, question),
            response,
        )
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}

/// A turn with its response already converted to document blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTurn {
    pub query: String,
    pub blocks: Vec<DocumentBlock>,
}

/// Append-only record of a chat session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
    documents: Vec<String>,
}

impl Transcript {
    pub fn new(documents: Vec<String>) -> Self {
        Self {
            turns: Vec::new(),
            documents,
        }
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders every turn independently, in chat order.
    pub fn render(&self) -> Vec<RenderedTurn> {
        self.turns
            .iter()
            .map(|turn| RenderedTurn {
                query: turn.query.clone(),
                blocks: render(&turn.response),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStatus::Success => write!(f, "Success"),
            ExtractionStatus::PartialSuccess => write!(f, "Partial Success (No Tables Found)"),
            ExtractionStatus::Failure => write!(f, "Failure"),
        }
    }
}

/// Outcome of extracting tables from one PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionLogEntry {
    pub pdf_filename: String,
    pub status: ExtractionStatus,
    pub processing_time_seconds: f64,
    pub message: String,
    pub extracted_tables: Vec<String>,
}

impl ExtractionLogEntry {
    pub fn failure(pdf_filename: impl Into<String>, seconds: f64, message: impl Into<String>) -> Self {
        Self {
            pdf_filename: pdf_filename.into(),
            status: ExtractionStatus::Failure,
            processing_time_seconds: seconds,
            message: message.into(),
            extracted_tables: Vec::new(),
        }
    }

    /// Success when at least one table came back, partial success otherwise.
    pub fn completed(
        pdf_filename: impl Into<String>,
        seconds: f64,
        message: impl Into<String>,
        extracted_tables: Vec<String>,
    ) -> Self {
        let (status, extracted_tables) = if extracted_tables.is_empty() {
            (ExtractionStatus::PartialSuccess, vec!["None".to_string()])
        } else {
            (ExtractionStatus::Success, extracted_tables)
        };
        Self {
            pdf_filename: pdf_filename.into(),
            status,
            processing_time_seconds: seconds,
            message: message.into(),
            extracted_tables,
        }
    }
}
