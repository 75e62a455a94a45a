pub mod binary;
pub mod sandbox;

use serde::Serialize;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::HealthCheckError;
use crate::repair::RepairAction;
use crate::runtime::ContainerRuntime;

/// What the health checker needs to know about the upcoming launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub binary_path: PathBuf,
    pub image: String,
}

impl LaunchTarget {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            binary_path: settings.binary_path(),
            image: settings.image.clone(),
        }
    }
}

/// Proof that preflight ran (or was disabled) for this invocation.
///
/// Only [`HealthChecker`] can produce one, and a `LaunchSpec` cannot be
/// assembled without it.
#[derive(Debug, Clone)]
pub struct Preflight {
    checked: bool,
    repairs: Vec<RepairAction>,
}

impl Preflight {
    fn skipped() -> Self {
        Self {
            checked: false,
            repairs: Vec::new(),
        }
    }

    pub fn was_checked(&self) -> bool {
        self.checked
    }

    pub fn repairs(&self) -> &[RepairAction] {
        &self.repairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Pass,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub category: String,
    pub severity: CheckSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Pass,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn error(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Error,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn warning(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Warning,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn info(name: &str, category: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity: CheckSeverity::Info,
            message: message.to_string(),
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: &str) -> Self {
        self.suggested_fix = Some(fix.to_string());
        self
    }
}

/// Pre-launch verification, short-circuiting on the first failure:
/// runtime present, binary exists, binary executable (repaired in place),
/// image can start a container.
pub struct HealthChecker<'a> {
    runtime: &'a dyn ContainerRuntime,
    enabled: bool,
}

impl<'a> HealthChecker<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, enabled: bool) -> Self {
        Self { runtime, enabled }
    }

    /// Run the checks. When disabled this succeeds without touching anything.
    pub fn check(&self, target: &LaunchTarget) -> Result<Preflight, HealthCheckError> {
        if !self.enabled {
            tracing::debug!("health check disabled; skipping preflight");
            return Ok(Preflight::skipped());
        }
        self.run(target, &mut Vec::new())
    }

    /// Run the checks regardless of the toggle and describe every executed step
    pub fn report(&self, target: &LaunchTarget) -> Vec<CheckResult> {
        let mut results = Vec::new();
        if let Err(e) = self.run(target, &mut results) {
            let (name, category) = match &e {
                HealthCheckError::RuntimeUnavailable { .. } => (sandbox::RUNTIME_CHECK, "runtime"),
                HealthCheckError::BinaryMissing { .. } => (binary::EXISTS_CHECK, "binary"),
                HealthCheckError::BinaryNotExecutable { .. } => (binary::EXECUTABLE_CHECK, "binary"),
                HealthCheckError::ImageUnreachable { .. } => (sandbox::IMAGE_CHECK, "image"),
            };
            results.push(CheckResult::error(name, category, &e.to_string()).with_fix(&e.hint()));
        }
        results
    }

    fn run(&self, target: &LaunchTarget, log: &mut Vec<CheckResult>) -> Result<Preflight, HealthCheckError> {
        tracing::info!(runtime = %self.runtime.program(), "running health checks");

        sandbox::check_runtime(self.runtime)?;
        log.push(CheckResult::pass(
            sandbox::RUNTIME_CHECK,
            "runtime",
            &format!("`{}` found on PATH", self.runtime.program()),
        ));

        binary::check_exists(&target.binary_path)?;
        log.push(CheckResult::pass(
            binary::EXISTS_CHECK,
            "binary",
            &target.binary_path.display().to_string(),
        ));

        let mut repairs = Vec::new();
        match binary::check_executable(&target.binary_path)? {
            Some(action) => {
                log.push(
                    CheckResult::warning(binary::EXECUTABLE_CHECK, "binary", &action.description)
                        .with_fix(&action.command),
                );
                repairs.push(action);
            }
            None => log.push(CheckResult::pass(binary::EXECUTABLE_CHECK, "binary", "")),
        }

        sandbox::check_image(self.runtime, &target.image)?;
        log.push(CheckResult::pass(
            sandbox::IMAGE_CHECK,
            "image",
            &format!("`{}` started a container", target.image),
        ));

        Ok(Preflight {
            checked: true,
            repairs,
        })
    }
}
