//! Setup wizard tests
//!
//! The wizard runs end to end against a scripted prompter and fake runtime,
//! builder, client registry and prober.
#![cfg(unix)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

use ghbox::build::{BinaryBuilder, BuildCapability};
use ghbox::config::{Environment, Settings};
use ghbox::credential::{Credential, PRIMARY_TOKEN_ENV};
use ghbox::error::{BuildError, CredentialError, HealthCheckError, SetupError};
use ghbox::launch::LaunchSpec;
use ghbox::runtime::ContainerRuntime;
use ghbox::setup::prompt::Prompter;
use ghbox::setup::registry::{ClientRegistry, RegistrationStatus};
use ghbox::setup::selftest::{ProbeOutcome, Prober};
use ghbox::setup::{ClientTarget, Collaborators, SetupOptions, SetupSession, Verdict, Wizard};
use ghbox::utils::CommandResult;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Debug)]
enum Answer {
    Confirm(bool),
    Select(usize),
    Secret(&'static str),
}

#[derive(Default)]
struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, prompt: &str) -> Answer {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for {:?}", prompt))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool, SetupError> {
        match self.next(prompt) {
            Answer::Confirm(value) => Ok(value),
            other => panic!("expected confirm for {:?}, scripted {:?}", prompt, other),
        }
    }

    fn select(&mut self, prompt: &str, items: &[&str], _default: usize) -> Result<usize, SetupError> {
        match self.next(prompt) {
            Answer::Select(index) => {
                assert!(index < items.len());
                Ok(index)
            }
            other => panic!("expected select for {:?}, scripted {:?}", prompt, other),
        }
    }

    fn secret(&mut self, prompt: &str) -> Result<String, SetupError> {
        match self.next(prompt) {
            Answer::Secret(value) => Ok(value.to_string()),
            other => panic!("expected secret for {:?}, scripted {:?}", prompt, other),
        }
    }

    fn note(&mut self, _message: &str) {}
}

fn exit_output(code: i32, stdout: &str) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

struct FakeRuntime {
    available: bool,
}

impl ContainerRuntime for FakeRuntime {
    fn program(&self) -> &str {
        "fake-runtime"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn run_noop(&self, _image: &str) -> CommandResult {
        CommandResult::Success(exit_output(0, ""))
    }
}

struct FakeBuilder {
    capability: BuildCapability,
    builds: Cell<usize>,
}

impl FakeBuilder {
    fn unavailable() -> Self {
        Self {
            capability: BuildCapability::Unavailable {
                reason: "no source checkout".to_string(),
            },
            builds: Cell::new(0),
        }
    }

    fn available() -> Self {
        Self {
            capability: BuildCapability::Available {
                source_dir: PathBuf::from("/src/github-mcp-server"),
            },
            builds: Cell::new(0),
        }
    }
}

impl BinaryBuilder for FakeBuilder {
    fn capability(&self) -> BuildCapability {
        self.capability.clone()
    }

    fn build(&self, output: &Path) -> Result<(), BuildError> {
        self.builds.set(self.builds.get() + 1);
        fs::create_dir_all(output.parent().unwrap()).unwrap();
        fs::write(output, "#!/bin/sh\n").unwrap();
        fs::set_permissions(output, fs::Permissions::from_mode(0o755)).unwrap();
        Ok(())
    }
}

struct FakeRegistry {
    available: bool,
    register_code: i32,
    query: RegistrationStatus,
    registered: RefCell<Vec<(PathBuf, String)>>,
}

impl FakeRegistry {
    fn new(register_code: i32, query: RegistrationStatus) -> Self {
        Self {
            available: true,
            register_code,
            query,
            registered: RefCell::new(Vec::new()),
        }
    }
}

impl ClientRegistry for FakeRegistry {
    fn program(&self) -> &str {
        "claude"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn register(&self, command: &Path, credential: &Credential) -> CommandResult {
        self.registered
            .borrow_mut()
            .push((command.to_path_buf(), credential.expose().to_string()));
        let output = exit_output(self.register_code, "");
        if self.register_code == 0 {
            CommandResult::Success(output)
        } else {
            CommandResult::Failed(output)
        }
    }

    fn query(&self) -> RegistrationStatus {
        if self.available {
            self.query.clone()
        } else {
            RegistrationStatus::NotAvailable
        }
    }
}

struct FakeProber {
    outcome: ProbeOutcome,
    probes: Cell<usize>,
}

impl FakeProber {
    fn new(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            probes: Cell::new(0),
        }
    }
}

impl Prober for FakeProber {
    fn probe(&self, spec: &LaunchSpec) -> ProbeOutcome {
        self.probes.set(self.probes.get() + 1);
        assert!(spec.runtime_args().iter().any(|a| a == "stdio"));
        self.outcome.clone()
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    dir: TempDir,
    runtime: FakeRuntime,
    builder: FakeBuilder,
    registry: FakeRegistry,
    prober: FakeProber,
    env: Environment,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            runtime: FakeRuntime { available: true },
            builder: FakeBuilder::unavailable(),
            registry: FakeRegistry::new(0, RegistrationStatus::Configured),
            prober: FakeProber::new(ProbeOutcome::Responded),
            env: Environment::from_pairs([(PRIMARY_TOKEN_ENV, "tok123")]),
        }
    }

    fn bin_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    fn binary_path(&self) -> PathBuf {
        self.bin_dir().join("github-mcp-server")
    }

    fn install_binary(&self) {
        fs::create_dir_all(self.bin_dir()).unwrap();
        fs::write(self.binary_path(), "#!/bin/sh\n").unwrap();
        fs::set_permissions(self.binary_path(), fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn desktop_config(&self) -> PathBuf {
        self.dir.path().join("Claude").join("claude_desktop_config.json")
    }

    fn command_path(&self) -> PathBuf {
        PathBuf::from("/p/run")
    }

    fn run(&self, prompter: &mut ScriptedPrompter) -> Result<SetupSession, SetupError> {
        let settings = Settings {
            binary_dir: self.bin_dir(),
            binary_name: "github-mcp-server".to_string(),
            image: "alpine:latest".to_string(),
            runtime: "fake-runtime".to_string(),
            log_level: "info".to_string(),
            debug: false,
            health_check: false,
            memory_limit: None,
            cpu_limit: None,
        };
        let options = SetupOptions {
            settings,
            env: self.env.clone(),
            command_path: self.command_path(),
            desktop_config: self.desktop_config(),
        };
        let deps = Collaborators {
            runtime: &self.runtime,
            builder: &self.builder,
            registry: &self.registry,
            prober: &self.prober,
        };
        Wizard::new(options, deps, prompter).run()
    }
}

const DESKTOP_ONLY: usize = 0;
const CODE_ONLY: usize = 1;
const BOTH: usize = 2;
const PRINT_ONLY: usize = 3;

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Happy paths
// ============================================================================

#[test]
fn test_desktop_descriptor_for_env_token() {
    let h = Harness::new();
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),  // use token from env
        Answer::Confirm(false), // skip self-test
        Answer::Select(DESKTOP_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    let json = read_json(&h.desktop_config());
    assert_eq!(json["mcpServers"]["github"]["command"], "/p/run");
    assert_eq!(json["mcpServers"]["github"]["args"], serde_json::json!(["tok123"]));

    assert_eq!(session.reports.len(), 1);
    assert_eq!(session.reports[0].target, ClientTarget::ClaudeDesktop);
    assert_eq!(session.reports[0].verdict(), Verdict::Verified);
    assert!(session.all_verified());
    assert_eq!(session.visited.last(), Some(&"summary"));
    assert!(h.registry.registered.borrow().is_empty());
}

#[test]
fn test_both_targets_configured_and_verified() {
    let h = Harness::new();
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(BOTH),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert_eq!(session.reports.len(), 2);
    assert!(session.all_verified());
    assert_eq!(
        h.registry.registered.borrow().as_slice(),
        [(PathBuf::from("/p/run"), "tok123".to_string())]
    );
}

#[test]
fn test_declined_env_token_prompts_for_one() {
    let h = Harness::new();
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(false),
        Answer::Secret("typed-token"),
        Answer::Confirm(false),
        Answer::Select(CODE_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert_eq!(session.credential_source.as_deref(), Some("command line"));
    assert_eq!(h.registry.registered.borrow()[0].1, "typed-token");
}

#[test]
fn test_self_test_outcome_is_recorded_without_aborting() {
    let mut h = Harness::new();
    h.prober = FakeProber::new(ProbeOutcome::TimedOut);
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(true), // run self-test
        Answer::Select(DESKTOP_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert_eq!(h.prober.probes.get(), 1);
    assert_eq!(session.self_test, Some(ProbeOutcome::TimedOut));
    assert!(session.visited.contains(&"self_test"));
}

#[test]
fn test_missing_binary_is_built_after_confirmation() {
    let mut h = Harness::new();
    h.builder = FakeBuilder::available();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true), // build
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(DESKTOP_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert!(session.built_binary);
    assert_eq!(h.builder.builds.get(), 1);
    assert!(h.binary_path().is_file());
}

// ============================================================================
// Verification
// ============================================================================

#[test]
fn test_registration_claimed_but_not_found_is_a_mismatch() {
    let mut h = Harness::new();
    h.registry = FakeRegistry::new(0, RegistrationStatus::NotConfigured);
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(CODE_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    let verdict = session.reports[0].verdict();
    assert_eq!(
        verdict,
        Verdict::ReportedButUnverified(RegistrationStatus::NotConfigured)
    );
    assert!(verdict.describe().contains("reported success but verification failed"));
    assert!(!session.all_verified());
}

#[test]
fn test_failed_registration_is_not_configured() {
    let mut h = Harness::new();
    h.registry = FakeRegistry::new(1, RegistrationStatus::NotConfigured);
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(CODE_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    let report = &session.reports[0];
    assert!(!report.reported_success);
    assert_eq!(
        report.verdict(),
        Verdict::Unverified(RegistrationStatus::NotConfigured)
    );
}

#[test]
fn test_missing_client_cli_is_not_available() {
    let mut h = Harness::new();
    h.registry.available = false;
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(CODE_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert!(h.registry.registered.borrow().is_empty());
    assert_eq!(
        session.reports[0].verification,
        Some(RegistrationStatus::NotAvailable)
    );
}

// ============================================================================
// Print only
// ============================================================================

#[test]
fn test_print_only_changes_nothing() {
    let h = Harness::new();
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(PRINT_ONLY),
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert!(!h.desktop_config().exists());
    assert!(!h.desktop_config().parent().unwrap().exists());
    assert!(h.registry.registered.borrow().is_empty());
    assert!(session.reports.is_empty());
    assert!(!session.visited.contains(&"verify_artifacts"));

    let printed = session.printed.unwrap();
    assert!(printed.descriptor.contains("\"tok123\""));
    assert_eq!(
        printed.registration_command,
        "claude mcp add github -- '/p/run' 'tok123'"
    );
}

// ============================================================================
// Existing Desktop configuration
// ============================================================================

#[test]
fn test_existing_config_is_backed_up_before_overwrite() {
    let h = Harness::new();
    h.install_binary();
    fs::create_dir_all(h.desktop_config().parent().unwrap()).unwrap();
    fs::write(h.desktop_config(), "{\"mcpServers\":{\"other\":{}}}").unwrap();

    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(DESKTOP_ONLY),
        Answer::Select(0), // back up and overwrite
    ]);

    let session = h.run(&mut prompter).unwrap();

    let backup = session.backup().unwrap().clone();
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("claude_desktop_config.json.backup-"));
    assert_eq!(
        fs::read_to_string(&backup).unwrap(),
        "{\"mcpServers\":{\"other\":{}}}"
    );
    assert_eq!(read_json(&h.desktop_config())["mcpServers"]["github"]["command"], "/p/run");
    assert_eq!(session.reports[0].verdict(), Verdict::Verified);
}

#[test]
fn test_existing_config_can_be_left_alone() {
    let h = Harness::new();
    h.install_binary();
    fs::create_dir_all(h.desktop_config().parent().unwrap()).unwrap();
    fs::write(h.desktop_config(), "{}").unwrap();

    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(true),
        Answer::Confirm(false),
        Answer::Select(DESKTOP_ONLY),
        Answer::Select(1), // write alternate file
    ]);

    let session = h.run(&mut prompter).unwrap();

    assert_eq!(fs::read_to_string(h.desktop_config()).unwrap(), "{}");
    let artifact = session.reports[0].artifact.clone().unwrap();
    assert_eq!(
        artifact.file_name().unwrap(),
        "claude_desktop_config.ghbox.json"
    );
    assert_eq!(read_json(&artifact)["mcpServers"]["github"]["args"][0], "tok123");
    assert_eq!(session.reports[0].verdict(), Verdict::Verified);
}

// ============================================================================
// Aborts
// ============================================================================

#[test]
fn test_missing_runtime_aborts_first() {
    let mut h = Harness::new();
    h.runtime.available = false;
    let mut prompter = ScriptedPrompter::new(vec![]);

    let err = h.run(&mut prompter).unwrap_err();
    assert!(matches!(
        err,
        SetupError::HealthCheck(HealthCheckError::RuntimeUnavailable { .. })
    ));
    assert!(prompter.asked.is_empty());
}

#[test]
fn test_no_binary_and_no_build_capability_aborts() {
    let h = Harness::new();
    let mut prompter = ScriptedPrompter::new(vec![]);

    let err = h.run(&mut prompter).unwrap_err();
    assert!(matches!(err, SetupError::Build(BuildError::Unavailable { .. })));
    assert!(!h.desktop_config().exists());
}

#[test]
fn test_declined_build_aborts() {
    let mut h = Harness::new();
    h.builder = FakeBuilder::available();
    let mut prompter = ScriptedPrompter::new(vec![Answer::Confirm(false)]);

    let err = h.run(&mut prompter).unwrap_err();
    assert!(matches!(err, SetupError::Build(BuildError::Declined)));
    assert_eq!(h.builder.builds.get(), 0);
}

#[test]
fn test_empty_token_aborts_with_credential_error() {
    let mut h = Harness::new();
    h.env = Environment::default();
    h.install_binary();
    let mut prompter = ScriptedPrompter::new(vec![Answer::Secret("")]);

    let err = h.run(&mut prompter).unwrap_err();
    assert!(matches!(err, SetupError::Credential(CredentialError::Missing)));
}
