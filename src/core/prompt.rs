use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tracing::{info, warn};

/// Interactive questions asked during an install.
///
/// The orchestrator never talks to the terminal directly; unattended runs get
/// an [`AutoPrompter`] that answers with each question's default.
pub trait Prompter: Send + Sync {
    fn confirm(&self, question: &str, default: bool) -> bool;
    fn input(&self, question: &str, default: &str) -> String;
}

/// Answers every question with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoPrompter;

impl Prompter for AutoPrompter {
    fn confirm(&self, question: &str, default: bool) -> bool {
        info!("{} [auto: {}]", question, if default { "yes" } else { "no" });
        default
    }

    fn input(&self, question: &str, default: &str) -> String {
        info!("{} [auto: {}]", question, default);
        default.to_string()
    }
}

/// dialoguer-backed prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> bool {
        match Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(default)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Prompt failed ({}), using default answer", e);
                default
            }
        }
    }

    fn input(&self, question: &str, default: &str) -> String {
        match Input::<String>::with_theme(&self.theme)
            .with_prompt(question)
            .default(default.to_string())
            .interact_text()
        {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!("Prompt failed ({}), using default answer", e);
                default.to_string()
            }
        }
    }
}
