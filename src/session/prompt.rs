//! Terminal prompts. Every prompt that can be dismissed returns `None` on Esc.

use crate::error::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use log::{log, Level};

/// Prints a message for the user and records it in the log.
pub fn log_and_print(message: &str, level: Level) {
    println!("{}", message);
    log!(level, "{}", message);
}

/// Asks the user to pick one of `options`; returns its index.
pub fn select<T: ToString>(prompt: &str, options: &[T]) -> Result<Option<usize>> {
    println!("{}", "-".repeat(30));
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact_opt()?;
    if choice.is_none() {
        log::warn!("User cancelled input prompt");
    }
    Ok(choice)
}

/// Yes/no question; dismissing it counts as "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}

/// Reads one trimmed line of free text.
pub fn read_line(prompt: &str) -> Result<String> {
    let line: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(line.trim().to_string())
}
