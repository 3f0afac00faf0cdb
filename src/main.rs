use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use finchat::session::prompt::{log_and_print, select};
use finchat::session::{list_companies, CompanySelection, Session};
use finchat::{load_api_key, Settings};
use log::{info, Level};
use std::path::{Path, PathBuf};

/// Interactive Financial Chatbot using the Gemini API.
#[derive(Parser, Debug)]
#[command(name = "finchat", version, about)]
struct Args {
    /// Base folder containing company subdirectories with PDF files
    #[arg(long)]
    pdf_folder: Option<PathBuf>,

    /// Name of the company subdirectory; skips interactive selection
    #[arg(long)]
    company: Option<String>,

    /// Base folder to save extracted Excel files
    #[arg(long)]
    excel_output_folder: Option<PathBuf>,

    /// Base folder to save Word chat transcripts and extraction logs
    #[arg(long)]
    log_output_folder: Option<PathBuf>,

    /// Path to the API key file
    #[arg(long)]
    api_key_file: Option<PathBuf>,

    /// Gemini model used for all requests
    #[arg(long)]
    model: Option<String>,

    /// JSON settings file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> finchat::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Some(folder) = &self.pdf_folder {
            settings.pdf_folder = folder.clone();
        }
        if let Some(folder) = &self.excel_output_folder {
            settings.excel_output_folder = folder.clone();
        }
        if let Some(folder) = &self.log_output_folder {
            settings.log_output_folder = folder.clone();
        }
        if let Some(file) = &self.api_key_file {
            settings.api_key_file = file.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn select_company(pdf_folder: &Path) -> Result<Option<CompanySelection>> {
    let companies = match list_companies(pdf_folder) {
        Ok(companies) => companies,
        Err(e) => {
            log_and_print(&format!("Error: {}", e), Level::Error);
            return Ok(None);
        }
    };

    if companies.is_empty() {
        log_and_print(
            &format!(
                "Warning: No company subdirectories found in '{}'.",
                pdf_folder.display()
            ),
            Level::Warn,
        );
        return Ok(Some(CompanySelection::NoCompanies));
    }

    let mut options = companies.clone();
    options.push("Skip company selection (chat without specific PDF context)".to_string());

    Ok(
        match select("Available companies for chat context:", &options)? {
            Some(idx) if idx < companies.len() => {
                info!("User selected company: {}", companies[idx]);
                Some(CompanySelection::Company(companies[idx].clone()))
            }
            Some(_) => {
                info!("User skipped company selection for chat.");
                Some(CompanySelection::General)
            }
            None => None,
        },
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = args.settings()?;

    let selection = match &args.company {
        Some(company) => Some(CompanySelection::Company(company.clone())),
        None => select_company(&settings.pdf_folder)?,
    };
    let Some(selection) = selection else {
        log_and_print(
            "No company selected or provided. Exiting application.",
            Level::Warn,
        );
        return Ok(());
    };

    let api_key = match load_api_key(&settings.api_key_file) {
        Ok(key) => key,
        Err(e) => {
            log_and_print(&format!("API Key not loaded: {}. Exiting.", e), Level::Error);
            return Ok(());
        }
    };

    Session::new(settings, api_key, selection)?.run().await?;
    Ok(())
}
