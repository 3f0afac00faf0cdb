//! Interactive flow: company and PDF selection, table export, chat.

pub mod prompt;
pub mod runner;

pub use runner::Session;

use crate::config::Settings;
use crate::error::{FinChatError, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Session name used when the PDF folder has no company subdirectories.
pub const DEFAULT_SESSION: &str = "Default_Session_NoCompany";
/// Session name used when the user skips company selection.
pub const GENERAL_SESSION: &str = "General_Chat_NoCompany";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanySelection {
    Company(String),
    /// The user chose to chat without company documents.
    General,
    /// No companies were available to choose from.
    NoCompanies,
}

impl CompanySelection {
    pub fn session_name(&self) -> &str {
        match self {
            CompanySelection::Company(name) => name,
            CompanySelection::General => GENERAL_SESSION,
            CompanySelection::NoCompanies => DEFAULT_SESSION,
        }
    }

    pub fn company(&self) -> Option<&str> {
        match self {
            CompanySelection::Company(name) => Some(name),
            _ => None,
        }
    }
}

/// Which PDFs the chat is grounded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisScope {
    SingleYear(PathBuf),
    MultiYear(Vec<PathBuf>),
}

impl AnalysisScope {
    pub fn pdfs(&self) -> Vec<PathBuf> {
        match self {
            AnalysisScope::SingleYear(pdf) => vec![pdf.clone()],
            AnalysisScope::MultiYear(pdfs) => pdfs.clone(),
        }
    }

    pub fn describe(&self, company: &str) -> String {
        match self {
            AnalysisScope::SingleYear(pdf) => format!(
                "Single-Year Analysis for {} ({})",
                company,
                file_name(pdf)
            ),
            AnalysisScope::MultiYear(_) => format!("Multi-Year Analysis for {}", company),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyPaths {
    pub pdf: PathBuf,
    pub log: PathBuf,
    pub excel: PathBuf,
}

impl CompanyPaths {
    pub fn new(settings: &Settings, session_name: &str) -> Self {
        Self {
            pdf: settings.pdf_folder.join(session_name),
            log: settings.log_output_folder.join(session_name),
            excel: settings.excel_output_folder.join(session_name),
        }
    }

    /// Creates the output directories.
    pub fn create_output_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.log)?;
        fs::create_dir_all(&self.excel)?;
        Ok(())
    }
}

/// Company subdirectories of the base PDF folder, sorted by name.
pub fn list_companies(pdf_folder: &Path) -> Result<Vec<String>> {
    if !pdf_folder.is_dir() {
        return Err(FinChatError::PdfFolderNotFound(
            pdf_folder.display().to_string(),
        ));
    }

    let mut companies: Vec<String> = fs::read_dir(pdf_folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    companies.sort();
    Ok(companies)
}

/// `*.pdf` files directly inside `folder`, sorted by path.
pub fn list_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }

    let mut pdfs: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<pdf stem>_extracted_tables.xlsx`
pub fn workbook_path(excel_dir: &Path, pdf: &Path) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    excel_dir.join(format!("{}_extracted_tables.xlsx", stem))
}

/// `<dir>/<session>_<kind>_<YYYYmmdd_HHMMSS>.docx`
pub fn timestamped_report_path(
    log_dir: &Path,
    session_name: &str,
    kind: &str,
    at: DateTime<Local>,
) -> PathBuf {
    log_dir.join(format!(
        "{}_{}_{}.docx",
        session_name,
        kind,
        at.format("%Y%m%d_%H%M%S")
    ))
}
