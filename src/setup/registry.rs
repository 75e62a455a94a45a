//! Command-based client registration (Claude Code) and the independent
//! registry query used to verify it.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::artifacts::SERVER_NAME;
use crate::credential::Credential;
use crate::utils::{command_exists, run_command_with_timeout, CommandResult, DEFAULT_COMMAND_TIMEOUT};

/// What the client's own registry says about the server entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum RegistrationStatus {
    Configured,
    NotConfigured,
    NotAvailable,
    Error(String),
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Configured => "configured",
            RegistrationStatus::NotConfigured => "not_configured",
            RegistrationStatus::NotAvailable => "not_available",
            RegistrationStatus::Error(_) => "error",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Error(detail) => write!(f, "error ({})", detail),
            other => f.write_str(other.as_str()),
        }
    }
}

pub trait ClientRegistry {
    /// Executable name, used in the printed registration command
    fn program(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Register the server; the result is what the client reported
    fn register(&self, command: &Path, credential: &Credential) -> CommandResult;

    /// Ask the registry, independently of `register`, whether the entry exists
    fn query(&self) -> RegistrationStatus;
}

/// The `claude` CLI
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    program: String,
}

impl ClaudeCli {
    pub fn new() -> Self {
        Self {
            program: "claude".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry for ClaudeCli {
    fn program(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn register(&self, command: &Path, credential: &Credential) -> CommandResult {
        // A stale entry makes `mcp add` fail, so drop it first
        let removed = run_command_with_timeout(
            &self.program,
            &["mcp", "remove", SERVER_NAME],
            DEFAULT_COMMAND_TIMEOUT,
        );
        tracing::debug!(removed = removed.is_success(), "cleared previous registration");

        let command = command.to_string_lossy().to_string();
        run_command_with_timeout(
            &self.program,
            &["mcp", "add", SERVER_NAME, "--", command.as_str(), credential.expose()],
            DEFAULT_COMMAND_TIMEOUT,
        )
    }

    fn query(&self) -> RegistrationStatus {
        if !self.is_available() {
            return RegistrationStatus::NotAvailable;
        }
        let result = run_command_with_timeout(
            &self.program,
            &["mcp", "get", SERVER_NAME],
            DEFAULT_COMMAND_TIMEOUT,
        );
        classify_query(&result)
    }
}

/// Map the outcome of `claude mcp get github` onto a registration status
pub fn classify_query(result: &CommandResult) -> RegistrationStatus {
    match result {
        CommandResult::Success(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains(SERVER_NAME) {
                RegistrationStatus::Configured
            } else {
                RegistrationStatus::NotConfigured
            }
        }
        CommandResult::Failed(_) => RegistrationStatus::NotConfigured,
        CommandResult::TimedOut => RegistrationStatus::Error(result.failure_detail(DEFAULT_COMMAND_TIMEOUT)),
        CommandResult::SpawnError(e) => RegistrationStatus::Error(e.clone()),
    }
}
