use crate::error::{FinChatError, Result};
use crate::llm::prompts::{table_extraction_prompt, SYSTEM_PROMPT_TABLE_EXTRACT};
use crate::llm::{client::GeminiClient, types::*};
use crate::table::RawTableSet;
use log::{debug, info};
use std::path::Path;
use tokio::sync::mpsc::Sender;

pub struct TableExtractor {
    client: GeminiClient,
    model: String,
    system_prompt: String,
}

impl TableExtractor {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: SYSTEM_PROMPT_TABLE_EXTRACT.to_string(),
        }
    }

    /// Allow the caller to swap in a different extraction prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Uploads one PDF, asks for `targets` as JSON and validates the reply.
    ///
    /// The uploaded file is deleted again whether or not extraction succeeds.
    pub async fn extract_tables(
        &self,
        path: &Path,
        targets: &[String],
        progress: Option<Sender<ExtractionEvent>>,
    ) -> Result<RawTableSet> {
        self.send_event(&progress, ExtractionEvent::Starting).await;
        info!(
            "Attempting to extract tables: {} from PDF: {}",
            targets.join(", "),
            path.display()
        );

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.send_event(&progress, ExtractionEvent::Uploading { filename })
            .await;

        let document = match self.client.upload_document(path).await {
            Ok(document) => document,
            Err(e) => {
                self.send_event(
                    &progress,
                    ExtractionEvent::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
                return Err(e);
            }
        };

        let result = self.request_tables(&document, targets, &progress).await;
        self.client.delete_document(&document).await;

        match &result {
            Ok(tables) => {
                let tables_found = tables.extracted_names().len();
                info!(
                    "Successfully extracted and parsed tables from {} ({} found)",
                    path.display(),
                    tables_found
                );
                self.send_event(&progress, ExtractionEvent::Success { tables_found })
                    .await;
            }
            Err(e) => {
                self.send_event(
                    &progress,
                    ExtractionEvent::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
            }
        }
        result
    }

    async fn request_tables(
        &self,
        document: &RemoteDocument,
        targets: &[String],
        progress: &Option<Sender<ExtractionEvent>>,
    ) -> Result<RawTableSet> {
        self.send_event(progress, ExtractionEvent::Extracting).await;

        let prompt = table_extraction_prompt(document, targets);
        let raw_json = self
            .client
            .generate_content(
                &self.model,
                Some(&self.system_prompt),
                vec![Content::user_with_files(prompt, std::slice::from_ref(document))],
                Some("application/json"),
            )
            .await?;

        self.send_event(progress, ExtractionEvent::ProcessingResponse)
            .await;
        debug!(
            "Raw LLM response for table extraction from {}: {}",
            document.display_name,
            raw_json.chars().take(500).collect::<String>()
        );

        parse_table_response(&raw_json, targets, &document.display_name)
    }

    async fn send_event(&self, sender: &Option<Sender<ExtractionEvent>>, event: ExtractionEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}

/// Parses the model's JSON reply into one raw table per requested name.
pub fn parse_table_response(raw: &str, targets: &[String], document: &str) -> Result<RawTableSet> {
    let cleaned = clean_json_output(raw);
    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| FinChatError::ResponseParse {
            document: document.to_string(),
            details: format!(
                "{}. Response text: {}",
                e,
                raw.chars().take(500).collect::<String>()
            ),
        })?;

    if !value.is_object() {
        return Err(FinChatError::ResponseParse {
            document: document.to_string(),
            details: "expected a JSON object keyed by table name".to_string(),
        });
    }

    Ok(RawTableSet::from_response(&value, targets))
}

fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawTable;

    fn targets() -> Vec<String> {
        vec![
            "CONSOLIDATED BALANCE SHEETS".to_string(),
            "CONSOLIDATED STATEMENTS OF OPERATIONS".to_string(),
        ]
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = "```json\n{\"CONSOLIDATED BALANCE SHEETS\": [[\"Item\", \"2023\"], [\"Cash\", \"$5\"]]}\n```";
        let tables = parse_table_response(raw, &targets(), "a.pdf").unwrap();
        assert_eq!(
            tables.extracted_names(),
            vec!["CONSOLIDATED BALANCE SHEETS".to_string()]
        );
        assert_eq!(
            tables.get("CONSOLIDATED STATEMENTS OF OPERATIONS"),
            Some(&RawTable::Missing)
        );
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_table_response("not json at all", &targets(), "a.pdf").unwrap_err();
        assert!(matches!(err, FinChatError::ResponseParse { .. }));

        let err = parse_table_response("[1, 2]", &targets(), "a.pdf").unwrap_err();
        assert!(matches!(err, FinChatError::ResponseParse { .. }));
    }

    #[tokio::test]
    async fn test_missing_pdf_reports_failure() {
        let extractor = TableExtractor::new(GeminiClient::new("test-key".to_string()), "gemini-2.5-pro");
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("FY2023.pdf");

        let result = extractor.extract_tables(&missing, &targets(), Some(tx)).await;
        assert!(matches!(result, Err(FinChatError::IoError(_))));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events[0], ExtractionEvent::Starting));
        assert!(matches!(
            &events[1],
            ExtractionEvent::Uploading { filename } if filename == "FY2023.pdf"
        ));
        assert!(matches!(events.last(), Some(ExtractionEvent::Failed { .. })));
    }
}
