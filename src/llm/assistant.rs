use log::{info, warn};

use crate::error::{FinChatError, Result};
use crate::llm::client::GeminiClient;
use crate::llm::prompts::{chat_prompt, SYSTEM_PROMPT_ANALYST};
use crate::llm::types::{Content, RemoteDocument};

pub struct DocumentAssistant {
    client: GeminiClient,
    model: String,
}

impl DocumentAssistant {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Ask a question about a specific set of documents.
    ///
    /// # Arguments
    /// * `query` - The user's question
    /// * `documents` - Uploaded files to include as context
    ///
    /// Returns the model's Markdown answer.
    pub async fn ask(&self, query: &str, documents: &[RemoteDocument]) -> Result<String> {
        if documents.is_empty() {
            warn!("No PDF files provided for context");
            return Err(FinChatError::NoDocuments);
        }

        info!(
            "Generating chat response for query: '{}' using {} PDF(s)",
            query,
            documents.len()
        );
        let content = Content::user_with_files(chat_prompt(query, documents), documents);
        let answer = self
            .client
            .generate_content(&self.model, Some(SYSTEM_PROMPT_ANALYST), vec![content], None)
            .await?;

        info!("Successfully generated chat response for query: '{}'", query);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ask_requires_documents() {
        let assistant = DocumentAssistant::new(GeminiClient::new("test-key".to_string()), "gemini-2.5-pro");
        let result = assistant.ask("What is the current ratio?", &[]).await;
        assert!(matches!(result, Err(FinChatError::NoDocuments)));
    }
}
