//! Interactive setup wizard
//!
//! A finite state machine:
//!
//! ```text
//! CheckPrerequisites -> CheckOrBuildBinary -> ResolveCredential -> SelfTest
//!     -> SelectClientTargets -> GenerateArtifacts -> VerifyArtifacts -> Summary
//! ```
//!
//! Any step may move to `Aborted` with the specific component error. All
//! external effects go through the collaborator traits so the flow can be
//! driven by tests.

pub mod artifacts;
pub mod prompt;
pub mod registry;
pub mod selftest;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::build::{BinaryBuilder, BuildCapability};
use crate::checks::{binary, sandbox, HealthChecker, LaunchTarget};
use crate::config::{Environment, Settings};
use crate::credential::{self, Credential};
use crate::error::{BuildError, SetupError};
use crate::launch::LaunchSpec;
use crate::runtime::ContainerRuntime;

use artifacts::ExistingArtifactChoice;
use prompt::Prompter;
use registry::{ClientRegistry, RegistrationStatus};
use selftest::{ProbeOutcome, Prober};

#[derive(Debug)]
pub enum SetupState {
    CheckPrerequisites,
    CheckOrBuildBinary,
    ResolveCredential,
    SelfTest,
    SelectClientTargets,
    GenerateArtifacts,
    VerifyArtifacts,
    Summary,
    Aborted(SetupError),
}

impl SetupState {
    pub fn name(&self) -> &'static str {
        match self {
            SetupState::CheckPrerequisites => "check_prerequisites",
            SetupState::CheckOrBuildBinary => "check_or_build_binary",
            SetupState::ResolveCredential => "resolve_credential",
            SetupState::SelfTest => "self_test",
            SetupState::SelectClientTargets => "select_client_targets",
            SetupState::GenerateArtifacts => "generate_artifacts",
            SetupState::VerifyArtifacts => "verify_artifacts",
            SetupState::Summary => "summary",
            SetupState::Aborted(_) => "aborted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientTarget {
    ClaudeDesktop,
    ClaudeCode,
}

impl fmt::Display for ClientTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientTarget::ClaudeDesktop => write!(f, "Claude Desktop"),
            ClientTarget::ClaudeCode => write!(f, "Claude Code"),
        }
    }
}

/// The fixed target menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelection {
    DesktopOnly,
    CodeOnly,
    Both,
    PrintOnly,
}

impl TargetSelection {
    pub const MENU: [TargetSelection; 4] = [
        TargetSelection::DesktopOnly,
        TargetSelection::CodeOnly,
        TargetSelection::Both,
        TargetSelection::PrintOnly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TargetSelection::DesktopOnly => "Claude Desktop only",
            TargetSelection::CodeOnly => "Claude Code only",
            TargetSelection::Both => "Both Claude Desktop and Claude Code",
            TargetSelection::PrintOnly => "Print configuration only (change nothing)",
        }
    }

    /// Targets that get configured; empty for print-only
    pub fn targets(self) -> &'static [ClientTarget] {
        match self {
            TargetSelection::DesktopOnly => &[ClientTarget::ClaudeDesktop],
            TargetSelection::CodeOnly => &[ClientTarget::ClaudeCode],
            TargetSelection::Both => &[ClientTarget::ClaudeDesktop, ClientTarget::ClaudeCode],
            TargetSelection::PrintOnly => &[],
        }
    }
}

/// Final classification of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "detail")]
pub enum Verdict {
    Verified,
    /// The configuration step claimed success but the independent check disagrees
    ReportedButUnverified(RegistrationStatus),
    Unverified(RegistrationStatus),
}

impl Verdict {
    pub fn describe(&self) -> String {
        match self {
            Verdict::Verified => "configured and verified".to_string(),
            Verdict::ReportedButUnverified(status) => format!(
                "reported success but verification failed (registry says {})",
                status
            ),
            Verdict::Unverified(status) => format!("not configured ({})", status),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: ClientTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    /// Whether the configuration step itself reported success
    pub reported_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub verification: Option<RegistrationStatus>,
}

impl TargetReport {
    fn new(target: ClientTarget) -> Self {
        Self {
            target,
            artifact: None,
            backup: None,
            reported_success: false,
            detail: None,
            verification: None,
        }
    }

    pub fn verdict(&self) -> Verdict {
        let status = self
            .verification
            .clone()
            .unwrap_or_else(|| RegistrationStatus::Error("not verified".to_string()));
        if status == RegistrationStatus::Configured {
            Verdict::Verified
        } else if self.reported_success {
            Verdict::ReportedButUnverified(status)
        } else {
            Verdict::Unverified(status)
        }
    }
}

/// Artifacts shown to the user instead of being applied
#[derive(Debug, Clone, Serialize)]
pub struct PrintedArtifacts {
    pub descriptor: String,
    pub registration_command: String,
}

/// Wizard-local state, discarded when the wizard exits
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupSession {
    pub visited: Vec<&'static str>,
    pub built_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_test: Option<ProbeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_test_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<TargetSelection>,
    pub reports: Vec<TargetReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed: Option<PrintedArtifacts>,
}

impl SetupSession {
    /// Every configured target verified (print-only counts as success)
    pub fn all_verified(&self) -> bool {
        self.reports.iter().all(|r| r.verdict() == Verdict::Verified)
    }

    /// Backup made while overwriting an existing artifact, if any
    pub fn backup(&self) -> Option<&PathBuf> {
        self.reports.iter().find_map(|r| r.backup.as_ref())
    }
}

/// Paths and settings the wizard works with
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub settings: Settings,
    pub env: Environment,
    /// Launcher executable written into the client artifacts
    pub command_path: PathBuf,
    pub desktop_config: PathBuf,
}

/// External collaborators
pub struct Collaborators<'a> {
    pub runtime: &'a dyn ContainerRuntime,
    pub builder: &'a dyn BinaryBuilder,
    pub registry: &'a dyn ClientRegistry,
    pub prober: &'a dyn Prober,
}

pub struct Wizard<'a> {
    options: SetupOptions,
    deps: Collaborators<'a>,
    prompter: &'a mut dyn Prompter,
    session: SetupSession,
    credential: Option<Credential>,
}

impl<'a> Wizard<'a> {
    pub fn new(options: SetupOptions, deps: Collaborators<'a>, prompter: &'a mut dyn Prompter) -> Self {
        Self {
            options,
            deps,
            prompter,
            session: SetupSession::default(),
            credential: None,
        }
    }

    /// Drive the state machine to a terminal state
    pub fn run(mut self) -> Result<SetupSession, SetupError> {
        let mut state = SetupState::CheckPrerequisites;
        loop {
            self.session.visited.push(state.name());
            state = match state {
                SetupState::Summary => return Ok(self.session),
                SetupState::Aborted(e) => {
                    tracing::debug!(error = %e, "setup aborted");
                    return Err(e);
                }
                other => self.step(other),
            };
        }
    }

    fn step(&mut self, state: SetupState) -> SetupState {
        let next = match state {
            SetupState::CheckPrerequisites => self.check_prerequisites(),
            SetupState::CheckOrBuildBinary => self.check_or_build_binary(),
            SetupState::ResolveCredential => self.resolve_credential(),
            SetupState::SelfTest => self.self_test(),
            SetupState::SelectClientTargets => self.select_targets(),
            SetupState::GenerateArtifacts => self.generate_artifacts(),
            SetupState::VerifyArtifacts => self.verify_artifacts(),
            terminal => Ok(terminal),
        };
        next.unwrap_or_else(SetupState::Aborted)
    }

    fn check_prerequisites(&mut self) -> Result<SetupState, SetupError> {
        sandbox::check_runtime(self.deps.runtime)?;
        self.prompter.note(&format!(
            "Container runtime `{}` found",
            self.deps.runtime.program()
        ));
        Ok(SetupState::CheckOrBuildBinary)
    }

    fn check_or_build_binary(&mut self) -> Result<SetupState, SetupError> {
        let binary_path = self.options.settings.binary_path();
        if binary::check_exists(&binary_path).is_ok() {
            self.prompter
                .note(&format!("Server binary found at {}", binary_path.display()));
            return Ok(SetupState::ResolveCredential);
        }

        match self.deps.builder.capability() {
            BuildCapability::Unavailable { reason } => {
                Err(BuildError::Unavailable { reason }.into())
            }
            BuildCapability::Available { source_dir } => {
                let build = self.prompter.confirm(
                    &format!(
                        "No server binary at {}. Build it from {} now?",
                        binary_path.display(),
                        source_dir.display()
                    ),
                    true,
                )?;
                if !build {
                    return Err(BuildError::Declined.into());
                }
                self.deps.builder.build(&binary_path)?;
                binary::check_exists(&binary_path)?;
                self.session.built_binary = true;
                self.prompter
                    .note(&format!("Built server binary at {}", binary_path.display()));
                Ok(SetupState::ResolveCredential)
            }
        }
    }

    fn resolve_credential(&mut self) -> Result<SetupState, SetupError> {
        if let Ok(found) = credential::resolve(None, &self.options.env) {
            let use_it = self
                .prompter
                .confirm(&format!("Use the GitHub token from {}?", found.source), true)?;
            if use_it {
                self.session.credential_source = Some(found.source.to_string());
                self.credential = Some(found.credential);
                return Ok(SetupState::SelfTest);
            }
        }

        let entered = self.prompter.secret("GitHub personal access token")?;
        let resolved = credential::resolve(Some(&entered), &Environment::default())?;
        self.session.credential_source = Some(resolved.source.to_string());
        self.credential = Some(resolved.credential);
        Ok(SetupState::SelfTest)
    }

    fn self_test(&mut self) -> Result<SetupState, SetupError> {
        if !self.prompter.confirm("Run a protocol self-test now?", true)? {
            return Ok(SetupState::SelectClientTargets);
        }

        let credential = self.credential()?.clone();
        let target = LaunchTarget::from_settings(&self.options.settings);
        let checker = HealthChecker::new(self.deps.runtime, true);

        match checker.check(&target) {
            Ok(preflight) => {
                let spec = LaunchSpec::assemble(&preflight, &self.options.settings, credential, Vec::new());
                self.prompter.note("Sending initialize request to the sandboxed server...");
                let outcome = self.deps.prober.probe(&spec);
                if !outcome.is_success() {
                    tracing::warn!(outcome = ?outcome, "self-test did not get a protocol response");
                }
                self.session.self_test = Some(outcome);
            }
            Err(e) => {
                tracing::warn!(error = %e, "self-test skipped: health check failed");
                self.session.self_test_error = Some(e.to_string());
            }
        }
        Ok(SetupState::SelectClientTargets)
    }

    fn select_targets(&mut self) -> Result<SetupState, SetupError> {
        let labels: Vec<&str> = TargetSelection::MENU.iter().map(|s| s.label()).collect();
        let index = self
            .prompter
            .select("Which clients should use the GitHub MCP server?", &labels, 2)?;
        let selection = TargetSelection::MENU
            .get(index)
            .copied()
            .unwrap_or(TargetSelection::PrintOnly);
        self.session.selection = Some(selection);
        Ok(SetupState::GenerateArtifacts)
    }

    fn generate_artifacts(&mut self) -> Result<SetupState, SetupError> {
        let credential = self.credential()?.clone();
        let selection = self.session.selection.unwrap_or(TargetSelection::PrintOnly);
        let command_path = self.options.command_path.clone();

        if selection == TargetSelection::PrintOnly {
            let descriptor = artifacts::descriptor(&command_path, &credential);
            self.session.printed = Some(PrintedArtifacts {
                descriptor: serde_json::to_string_pretty(&descriptor)?,
                registration_command: artifacts::registration_command(
                    self.deps.registry.program(),
                    &command_path,
                    &credential,
                ),
            });
            return Ok(SetupState::Summary);
        }

        for target in selection.targets() {
            let report = match target {
                ClientTarget::ClaudeDesktop => self.write_desktop(&command_path, &credential)?,
                ClientTarget::ClaudeCode => self.register_code(&command_path, &credential),
            };
            self.session.reports.push(report);
        }
        Ok(SetupState::VerifyArtifacts)
    }

    fn write_desktop(&mut self, command_path: &Path, credential: &Credential) -> Result<TargetReport, SetupError> {
        let path = self.options.desktop_config.clone();
        let descriptor = artifacts::descriptor(command_path, credential);

        let choice = if path.exists() {
            let alternate = artifacts::alternate_path(&path);
            let backup_label = "Back up the existing file and overwrite it".to_string();
            let alternate_label = format!("Write to {} instead", alternate.display());
            let index = self.prompter.select(
                &format!("{} already exists", path.display()),
                &[backup_label.as_str(), alternate_label.as_str()],
                0,
            )?;
            Some(if index == 0 {
                ExistingArtifactChoice::BackupAndOverwrite
            } else {
                ExistingArtifactChoice::WriteAlternate
            })
        } else {
            None
        };

        let written = artifacts::write_descriptor(&path, &descriptor, choice)?;
        self.prompter
            .note(&format!("Wrote {}", written.path.display()));

        let mut report = TargetReport::new(ClientTarget::ClaudeDesktop);
        report.reported_success = true;
        report.artifact = Some(written.path);
        report.backup = written.backup;
        Ok(report)
    }

    fn register_code(&mut self, command_path: &Path, credential: &Credential) -> TargetReport {
        let mut report = TargetReport::new(ClientTarget::ClaudeCode);
        if !self.deps.registry.is_available() {
            report.detail = Some(format!("`{}` is not installed", self.deps.registry.program()));
            return report;
        }

        let result = self.deps.registry.register(command_path, credential);
        report.reported_success = result.is_success();
        if !report.reported_success {
            report.detail = Some(result.failure_detail(crate::utils::DEFAULT_COMMAND_TIMEOUT));
        }
        self.prompter.note(&format!(
            "Registration with {} {}",
            ClientTarget::ClaudeCode,
            if report.reported_success { "reported success" } else { "failed" }
        ));
        report
    }

    fn verify_artifacts(&mut self) -> Result<SetupState, SetupError> {
        let command_path = self.options.command_path.clone();
        for report in &mut self.session.reports {
            let status = match report.target {
                ClientTarget::ClaudeDesktop => match &report.artifact {
                    Some(path) => artifacts::verify_descriptor(path, &command_path),
                    None => RegistrationStatus::NotConfigured,
                },
                ClientTarget::ClaudeCode => self.deps.registry.query(),
            };
            report.verification = Some(status);
        }
        Ok(SetupState::Summary)
    }

    fn credential(&self) -> Result<&Credential, SetupError> {
        self.credential
            .as_ref()
            .ok_or_else(|| crate::error::CredentialError::Missing.into())
    }
}
