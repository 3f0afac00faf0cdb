use crate::error::{FinChatError, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// A named group of canned questions asked before interactive chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetCategory {
    pub name: String,
    pub questions: Vec<String>,
}

impl PresetCategory {
    fn single(name: &str, question: &str) -> Self {
        Self {
            name: name.to_string(),
            questions: vec![question.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub target_tables: Vec<String>,
    pub preset_questions: Vec<PresetCategory>,
    pub pdf_folder: PathBuf,
    pub excel_output_folder: PathBuf,
    pub log_output_folder: PathBuf,
    pub api_key_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            target_tables: vec![
                "CONSOLIDATED STATEMENTS OF CASH FLOWS".to_string(),
                "CONSOLIDATED STATEMENTS OF OPERATIONS".to_string(),
                "CONSOLIDATED BALANCE SHEETS".to_string(),
            ],
            preset_questions: vec![
                PresetCategory::single(
                    "Liability Overview",
                    "What are the company's total liabilities, how are they broken down by maturity and type, and what interest rates apply?",
                ),
                PresetCategory::single(
                    "Debt Characteristics",
                    "How are the company's debt instruments (short-term and long-term) structured, and what is their exposure to floating rates?",
                ),
                PresetCategory::single(
                    "Lease Obligations",
                    "What are the company's lease liabilities, both current and non-current, and how are they structured?",
                ),
                PresetCategory::single(
                    "Interest Rate Risk Hedging",
                    "Is the company exposed to interest rate risk, and does it use derivatives to manage this exposure? If so, specify the instruments, notional amounts, and their purpose.",
                ),
                PresetCategory::single(
                    "Currency Risk Hedging",
                    "Does the company hedge foreign exchange risk using derivatives? Provide details on the instruments used, currencies involved and maturities.",
                ),
            ],
            pdf_folder: PathBuf::from("fin_statements"),
            excel_output_folder: PathBuf::from("output/excel_reports"),
            log_output_folder: PathBuf::from("output/logs_and_transcripts"),
            api_key_file: PathBuf::from("api_key.txt"),
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file; omitted fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(FinChatError::Config("model name is empty".to_string()));
        }
        if self.target_tables.is_empty() {
            return Err(FinChatError::Config(
                "at least one target table is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads the Gemini API key from `path`.
///
/// The file content is trimmed and must not be empty. When the file does not
/// exist, the `GEMINI_API_KEY` environment variable is used instead.
pub fn load_api_key(path: &Path) -> Result<String> {
    if !path.exists() {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim().to_string();
            if !key.is_empty() {
                info!("Loaded API key from {}", API_KEY_ENV);
                return Ok(key);
            }
        }
        error!("API key file not found at: {}", path.display());
        return Err(FinChatError::ApiKeyMissing(path.display().to_string()));
    }

    let key = fs::read_to_string(path)?.trim().to_string();
    if key.is_empty() {
        error!("API key file '{}' is empty", path.display());
        return Err(FinChatError::ApiKeyEmpty(path.display().to_string()));
    }

    info!("Successfully loaded API key from {}", path.display());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.target_tables.len(), 3);
        assert_eq!(settings.preset_questions.len(), 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model": "gemini-2.5-flash", "pdf_folder": "pdfs" }}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.pdf_folder, PathBuf::from("pdfs"));
        assert_eq!(settings.target_tables, Settings::default().target_tables);
    }

    #[test]
    fn test_settings_without_tables_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_tables": [] }}"#).unwrap();
        assert!(matches!(
            Settings::from_file(file.path()),
            Err(FinChatError::Config(_))
        ));
    }

    #[test]
    fn test_api_key_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  secret-key  ").unwrap();
        assert_eq!(load_api_key(file.path()).unwrap(), "secret-key");
    }

    #[test]
    fn test_empty_api_key_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            load_api_key(file.path()),
            Err(FinChatError::ApiKeyEmpty(_))
        ));
    }
}
