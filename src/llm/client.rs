use crate::error::{FinChatError, Result};
use crate::llm::types::*;
use log::{debug, error, info};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_UPLOAD_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta/files";
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: u32 = 150;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    upload_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            upload_url: GEMINI_UPLOAD_URL.to_string(),
        }
    }

    /// Points the client at another deployment of the same REST API.
    pub fn with_base_url(mut self, base_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.upload_url = upload_url.into();
        self
    }

    /// Uploads a file and waits until Gemini has finished processing it.
    pub async fn upload_document(&self, path: &Path) -> Result<RemoteDocument> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FinChatError::Gemini("Invalid file name".to_string()))?;

        info!("Uploading PDF: {}", path.display());
        let file_size = fs::metadata(path).await?.len();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let file_bytes = fs::read(path).await?;

        let start_url = format!("{}?key={}", self.upload_url, self.api_key);
        let metadata = json!({ "file": { "display_name": file_name } });

        let init_res = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", file_size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", &mime_type)
            .header("Content-Type", "application/json")
            .json(&metadata)
            .send()
            .await?;

        let init_status = init_res.status();
        if !init_status.is_success() {
            let error_text = init_res.text().await?;
            return Err(FinChatError::Gemini(format!(
                "Upload init failed (status {}): {}",
                init_status, error_text
            )));
        }

        let upload_url = init_res
            .headers()
            .get("x-goog-upload-url")
            .ok_or_else(|| FinChatError::Gemini("No upload URL in headers".to_string()))?
            .to_str()
            .map_err(|e| FinChatError::Gemini(e.to_string()))?
            .to_string();

        let upload_res = self
            .client
            .post(&upload_url)
            .header("Content-Length", file_size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file_bytes)
            .send()
            .await?;

        let upload_status = upload_res.status();
        if !upload_status.is_success() {
            let error_text = upload_res.text().await?;
            return Err(FinChatError::Gemini(format!(
                "File upload failed (status {}): {}",
                upload_status, error_text
            )));
        }

        let upload_body: serde_json::Value = upload_res.json().await?;
        let file_obj = upload_body
            .get("file")
            .ok_or_else(|| FinChatError::Gemini("Upload response missing 'file'".to_string()))?;

        let uri = string_field(file_obj, "uri")?;
        let name = string_field(file_obj, "name")?;
        let mut state = file_state(file_obj);
        info!("Started upload for '{}' as '{}'", file_name, name);

        let mut attempts = 0;
        while state == "PROCESSING" {
            if attempts == MAX_POLL_ATTEMPTS {
                return Err(FinChatError::Gemini(format!(
                    "File '{}' still processing after {} status checks",
                    name, MAX_POLL_ATTEMPTS
                )));
            }
            attempts += 1;
            sleep(POLL_INTERVAL).await;

            let check_url = format!("{}/{}?key={}", self.base_url, name, self.api_key);
            let check_res = self.client.get(&check_url).send().await?;
            let check_status = check_res.status();
            if !check_status.is_success() {
                let error_text = check_res.text().await?;
                error!("Status check for '{}' failed: {}", name, check_status);
                return Err(FinChatError::Gemini(format!(
                    "File status check failed (status {}): {}",
                    check_status, error_text
                )));
            }

            let check_json: serde_json::Value = check_res.json().await?;
            state = file_state(check_json.get("file").unwrap_or(&check_json));
            debug!("File '{}' state: {}", name, state);
        }

        let document = RemoteDocument {
            uri,
            name,
            display_name: file_name.to_string(),
            mime_type,
            state,
        };
        if !document.is_active() {
            error!(
                "File upload failed for {} (state {})",
                path.display(),
                document.state
            );
            return Err(FinChatError::Gemini(format!(
                "File upload failed for {} (state {})",
                path.display(),
                document.state
            )));
        }

        info!(
            "Successfully uploaded file '{}' ({})",
            path.display(),
            document.name
        );
        Ok(document)
    }

    /// Removes an uploaded file. Failures are logged and otherwise ignored.
    pub async fn delete_document(&self, document: &RemoteDocument) {
        let url = format!("{}/{}?key={}", self.base_url, document.name, self.api_key);
        match self.client.delete(&url).send().await {
            Ok(res) if res.status().is_success() => {
                info!("Successfully deleted uploaded file: {}", document.name)
            }
            Ok(res) => error!(
                "Failed to delete uploaded file {} (status {})",
                document.name,
                res.status()
            ),
            Err(e) => error!("Failed to delete uploaded file {}: {}", document.name, e),
        }
    }

    pub(crate) async fn generate_content(
        &self,
        model: &str,
        system_prompt: Option<&str>,
        messages: Vec<Content>,
        response_mime_type: Option<&str>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: system_prompt.map(Content::user),
            generation_config: GenerationConfig {
                response_mime_type: response_mime_type.map(str::to_string),
            },
        };

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(FinChatError::Gemini(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        body.first_text()
            .ok_or_else(|| FinChatError::Gemini("Model returned no text content".to_string()))
    }
}

/// A missing state is treated as still processing.
fn file_state(file_obj: &serde_json::Value) -> String {
    file_obj
        .get("state")
        .and_then(|v| v.as_str())
        .unwrap_or("PROCESSING")
        .to_string()
}

fn string_field(obj: &serde_json::Value, field: &str) -> Result<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| FinChatError::Gemini(format!("Upload response missing {}", field)))
}
