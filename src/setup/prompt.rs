use dialoguer::console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Password, Select};

use crate::error::SetupError;

/// The wizard's only channel to the user
pub trait Prompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, SetupError>;

    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> Result<usize, SetupError>;

    /// Hidden input; may return an empty string
    fn secret(&mut self, prompt: &str) -> Result<String, SetupError>;

    /// Progress note between prompts
    fn note(&mut self, message: &str);
}

pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, SetupError> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> Result<usize, SetupError> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn secret(&mut self, prompt: &str) -> Result<String, SetupError> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?)
    }

    fn note(&mut self, message: &str) {
        eprintln!("{} {}", style("›").cyan(), message);
    }
}
