use crate::config::Settings;
use crate::error::Result;
use crate::llm::{DocumentAssistant, ExtractionEvent, GeminiClient, RemoteDocument, TableExtractor};
use crate::report::{write_extraction_log, write_transcript, write_workbook, WorkbookOutcome};
use crate::session::prompt::{confirm, log_and_print, read_line, select};
use crate::session::{
    file_name, list_pdfs, timestamped_report_path, workbook_path, AnalysisScope, CompanyPaths,
    CompanySelection,
};
use crate::transcript::{ChatTurn, ExtractionLogEntry, Transcript};
use chrono::Local;
use log::{error, info, warn, Level};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::sleep;

const PRESET_QUESTION_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextAction {
    Preset,
    Interactive,
    Exit,
}

/// One run of the assistant for a selected company.
pub struct Session {
    settings: Settings,
    client: GeminiClient,
    extractor: TableExtractor,
    assistant: DocumentAssistant,
    selection: CompanySelection,
    paths: CompanyPaths,
    uploaded: Vec<RemoteDocument>,
    transcript: Transcript,
}

impl Session {
    pub fn new(settings: Settings, api_key: String, selection: CompanySelection) -> Result<Self> {
        let paths = CompanyPaths::new(&settings, selection.session_name());
        paths.create_output_dirs()?;

        let client = GeminiClient::new(api_key);
        let extractor = TableExtractor::new(client.clone(), settings.model.clone());
        let assistant = DocumentAssistant::new(client.clone(), settings.model.clone());
        info!("Gemini services initialized with model: {}", settings.model);

        Ok(Self {
            settings,
            client,
            extractor,
            assistant,
            selection,
            paths,
            uploaded: Vec::new(),
            transcript: Transcript::default(),
        })
    }

    /// Runs the session, then always saves the transcript and removes uploads.
    pub async fn run(mut self) -> Result<()> {
        log_and_print(
            &format!(
                "Starting Chatbot for Session: {}",
                self.selection.session_name()
            ),
            Level::Info,
        );

        let outcome = self.interact().await;
        if let Err(e) = &outcome {
            error!("An unexpected error occurred in the main application flow: {}", e);
            println!("A critical error occurred: {}", e);
        }
        self.finish().await;
        outcome
    }

    async fn interact(&mut self) -> Result<()> {
        let mut context = "General Chat".to_string();

        if let Some(company) = self.selection.company().map(str::to_string) {
            let all_pdfs = list_pdfs(&self.paths.pdf)?;
            match self.select_scope(&company, &all_pdfs)? {
                ScopeChoice::Cancelled => return Ok(()),
                ScopeChoice::NoPdfs => {
                    context = format!("Chat for {} (No PDFs found)", company);
                }
                ScopeChoice::Scope(scope) => {
                    context = scope.describe(&company);
                    self.transcript =
                        Transcript::new(scope.pdfs().iter().map(|p| file_name(p)).collect());
                    self.handle_table_extraction(&scope, &all_pdfs).await?;
                    self.upload_for_chat(&scope.pdfs()).await;
                }
            }
        }

        let action = self.next_action()?;
        if action == NextAction::Exit {
            return Ok(());
        }
        if action == NextAction::Preset {
            self.ask_preset_questions().await;
            println!("{}", "-".repeat(30));
            if !confirm("Preset questions answered. Proceed to interactive chatbot?")? {
                return Ok(());
            }
        }

        print_banner(&context);
        if action == NextAction::Preset {
            println!("\n--- You can now ask your own questions ---");
        }
        self.chat_loop().await
    }

    fn select_scope(&self, company: &str, all_pdfs: &[PathBuf]) -> Result<ScopeChoice> {
        if all_pdfs.is_empty() {
            log_and_print(
                &format!("Warning: No PDF files found for {}.", company),
                Level::Warn,
            );
            return Ok(ScopeChoice::NoPdfs);
        }

        let options = [
            "Single-Year (one PDF for chat)",
            "Multi-Year (all PDFs for chat)",
        ];
        let Some(choice) = select(&format!("For {}, select analysis type:", company), &options)?
        else {
            return Ok(ScopeChoice::Cancelled);
        };

        if choice == 1 {
            info!(
                "User selected Multi-Year Analysis. Using all {} PDFs.",
                all_pdfs.len()
            );
            return Ok(ScopeChoice::Scope(AnalysisScope::MultiYear(all_pdfs.to_vec())));
        }

        let names: Vec<String> = all_pdfs.iter().map(|p| file_name(p)).collect();
        match select("Select PDF for Single-Year Analysis:", &names)? {
            Some(idx) => {
                info!("User selected single PDF: {}", names[idx]);
                Ok(ScopeChoice::Scope(AnalysisScope::SingleYear(
                    all_pdfs[idx].clone(),
                )))
            }
            None => Ok(ScopeChoice::Cancelled),
        }
    }

    fn pdfs_to_extract(&self, scope: &AnalysisScope, all_pdfs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        match scope {
            AnalysisScope::SingleYear(pdf) => {
                let question = format!("Do you want to export tables for {}?", file_name(pdf));
                Ok(if confirm(&question)? {
                    vec![pdf.clone()]
                } else {
                    Vec::new()
                })
            }
            AnalysisScope::MultiYear(_) => {
                if !confirm("Do you want to export tables for the multi-year analysis?")? {
                    return Ok(Vec::new());
                }
                match select("Export for:", &["ALL years", "A SINGLE year"])? {
                    Some(0) => Ok(all_pdfs.to_vec()),
                    Some(_) => {
                        let names: Vec<String> = all_pdfs.iter().map(|p| file_name(p)).collect();
                        Ok(select("Select PDF for single-year table export:", &names)?
                            .map(|idx| vec![all_pdfs[idx].clone()])
                            .unwrap_or_default())
                    }
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    async fn handle_table_extraction(&self, scope: &AnalysisScope, all_pdfs: &[PathBuf]) -> Result<()> {
        println!("{}", "-".repeat(30));
        let pdfs = self.pdfs_to_extract(scope, all_pdfs)?;
        if pdfs.is_empty() {
            println!("Table export skipped.");
            return Ok(());
        }

        info!("Starting table extraction for {} PDF(s).", pdfs.len());
        let mut entries = Vec::new();
        for pdf in &pdfs {
            entries.push(self.extract_one(pdf).await);
        }

        let log_path = timestamped_report_path(
            &self.paths.log,
            self.selection.session_name(),
            "extraction_log",
            Local::now(),
        );
        match write_extraction_log(&entries, &log_path) {
            Ok(()) => println!("\nTable extraction log saved to: {}", log_path.display()),
            Err(e) => {
                error!("Failed to save extraction log to {}: {}", log_path.display(), e);
                println!("Error: Failed to save extraction log: {}", e);
            }
        }
        Ok(())
    }

    async fn extract_one(&self, pdf: &Path) -> ExtractionLogEntry {
        let pdf_name = file_name(pdf);
        println!("\nProcessing for tables: {}", pdf_name);
        let started = Instant::now();

        let (tx, mut rx) = mpsc::channel(16);
        let reporter = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ExtractionEvent::Uploading { filename } => println!("  Uploading {}...", filename),
                    ExtractionEvent::Extracting => println!("  Extracting tables..."),
                    ExtractionEvent::Failed { reason } => println!("  Error extracting tables: {}", reason),
                    _ => {}
                }
            }
        });

        let result = self
            .extractor
            .extract_tables(pdf, &self.settings.target_tables, Some(tx))
            .await;
        let _ = reporter.await;
        let seconds = started.elapsed().as_secs_f64();

        let tables = match result {
            Ok(tables) => tables,
            Err(e) => return ExtractionLogEntry::failure(pdf_name, seconds, e.to_string()),
        };

        let excel_path = workbook_path(&self.paths.excel, pdf);
        match write_workbook(&excel_path, &tables, &pdf_name) {
            Ok(WorkbookOutcome::Written { path, .. }) => {
                println!("  Tables extracted and formatted to: {}", path.display());
            }
            Ok(WorkbookOutcome::Empty) => {
                println!("  No valid tables found to save for {}.", pdf_name);
            }
            Err(e) => {
                error!("Failed to write Excel file at {}: {}", excel_path.display(), e);
                println!("  Error writing Excel file: {}", e);
            }
        }

        ExtractionLogEntry::completed(
            pdf_name,
            seconds,
            format!(
                "Extraction process completed. See log for table details. Saved to: {}",
                excel_path.display()
            ),
            tables.extracted_names(),
        )
    }

    async fn upload_for_chat(&mut self, pdfs: &[PathBuf]) {
        if pdfs.is_empty() {
            return;
        }
        println!(
            "\nUploading {} PDF(s) for chat context. This may take a moment...",
            pdfs.len()
        );

        for pdf in pdfs {
            let name = file_name(pdf);
            println!("  - Uploading {}...", name);
            match self.client.upload_document(pdf).await {
                Ok(document) => {
                    info!(
                        "Successfully uploaded '{}' (ID: {}) for chat context.",
                        name, document.name
                    );
                    println!("  Successfully uploaded {}.", name);
                    self.uploaded.push(document);
                }
                Err(e) => {
                    error!("Failed to upload {}: {}", name, e);
                    println!("  Error uploading {}. It will be excluded from the chat context.", name);
                }
            }
        }

        if self.uploaded.is_empty() {
            println!("\nWarning: All PDF uploads failed. Chat will proceed without document context.");
            warn!("All PDF uploads failed. No context for chat.");
        }
    }

    fn next_action(&self) -> Result<NextAction> {
        if self.uploaded.is_empty() {
            info!("No PDF context loaded, proceeding directly to interactive chat.");
            return Ok(NextAction::Interactive);
        }

        let options = [
            "Answer a set of preset financial questions",
            "Proceed directly to interactive chatbot",
            "Exit",
        ];
        Ok(match select("What would you like to do next?", &options)? {
            Some(0) => NextAction::Preset,
            Some(1) => NextAction::Interactive,
            _ => NextAction::Exit,
        })
    }

    async fn ask_preset_questions(&mut self) {
        println!("\n--- Answering Preset Financial Questions ---");
        info!("Starting to answer preset financial questions.");

        let categories = self.settings.preset_questions.clone();
        for category in &categories {
            println!("\n** {} **", category.name);
            for (idx, question) in category.questions.iter().enumerate() {
                println!("\nPreset Question {}: {}", idx + 1, question);
                info!("Asking preset question: {}", question);

                let response = match self.assistant.ask(question, &self.uploaded).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        error!("Error answering preset question: {}", e);
                        format!(
                            "Sorry, I encountered an error processing this preset question. {}",
                            e
                        )
                    }
                };
                println!("\nChatbot: {}", response);
                self.transcript
                    .push(ChatTurn::preset(&category.name, idx + 1, question, response));

                sleep(PRESET_QUESTION_DELAY).await;
            }
        }

        println!("\n--- Finished Answering Preset Financial Questions ---");
        info!("Finished answering preset financial questions.");
    }

    async fn chat_loop(&mut self) -> Result<()> {
        loop {
            println!();
            let query = read_line("You")?;
            if query.is_empty() {
                continue;
            }
            if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
                info!("User initiated exit.");
                return Ok(());
            }
            info!("User query: {}", query);

            if self.uploaded.is_empty() {
                println!("Chatbot: I don't have any documents loaded to answer your question. Please restart and select a company with PDFs.");
                continue;
            }

            let response = match self.assistant.ask(&query, &self.uploaded).await {
                Ok(answer) => answer,
                Err(e) => {
                    error!("An error occurred during chat: {}", e);
                    format!("Sorry, I encountered an error. {}", e)
                }
            };
            println!("\nChatbot: {}", response);
            self.transcript.push(ChatTurn::new(query, response));
        }
    }

    async fn finish(&mut self) {
        if !self.transcript.is_empty() {
            let path = timestamped_report_path(
                &self.paths.log,
                self.selection.session_name(),
                "chat_transcript",
                Local::now(),
            );
            println!("\nSaving chat transcript to {}...", path.display());
            if let Err(e) = write_transcript(&self.transcript, &path) {
                error!("Failed to save chat transcript to {}: {}", path.display(), e);
                println!("Error: Failed to save chat transcript: {}", e);
            }
        }

        if !self.uploaded.is_empty() {
            println!("\nCleaning up uploaded files...");
            info!("Cleaning up {} files from service.", self.uploaded.len());
            for document in self.uploaded.drain(..) {
                self.client.delete_document(&document).await;
            }
            println!("Cleanup complete.");
        }

        println!("\nThank you for using the Financial Chatbot. Goodbye!");
    }
}

enum ScopeChoice {
    Scope(AnalysisScope),
    NoPdfs,
    Cancelled,
}

fn print_banner(context: &str) {
    let rule = "=".repeat(50);
    println!("\n{}", rule);
    println!("{:^50}", "Financial Chatbot is Ready!");
    println!("{:^50}", format!("Context: {}", context));
    println!("{:^50}", "Type 'exit' or 'quit' to end the session.");
    println!("{}", rule);
}
