use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinChatError {
    #[error("API key file not found at: {0}")]
    ApiKeyMissing(String),

    #[error("API key file '{0}' is empty")]
    ApiKeyEmpty(String),

    #[error("Base PDF folder '{0}' not found")]
    PdfFolderNotFound(String),

    #[error("Gemini error: {0}")]
    Gemini(String),

    #[error("Failed to parse JSON response from LLM for {document}: {details}")]
    ResponseParse { document: String, details: String },

    #[error("No PDF documents loaded for context")]
    NoDocuments,

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Document packing error: {0}")]
    Document(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[cfg(feature = "cli")]
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FinChatError>;
