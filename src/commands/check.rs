use anyhow::Result;
use colored::Colorize;

use crate::checks::{CheckResult, CheckSeverity, HealthChecker, LaunchTarget};
use crate::config::{Environment, Settings};
use crate::credential;
use crate::output::{GhboxOutput, Issue, OutputFormat};
use crate::runtime::ContainerRuntime;

/// `ghbox --check`: run every health check regardless of the launch toggle
/// and report. Exits 1 when any check failed.
pub fn run(
    settings: &Settings,
    runtime: &dyn ContainerRuntime,
    explicit_token: Option<&str>,
    env: &Environment,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Text {
        println!("{}", "Running launch checks...".cyan());
        println!();
    }

    let results = collect(settings, runtime, explicit_token, env);
    let has_errors = results.iter().any(|r| r.severity == CheckSeverity::Error);

    match format {
        OutputFormat::Json => output_json(&results, settings, has_errors)?,
        OutputFormat::Text => output_text(&results),
    }

    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

/// Credential and health check results, in execution order
pub fn collect(
    settings: &Settings,
    runtime: &dyn ContainerRuntime,
    explicit_token: Option<&str>,
    env: &Environment,
) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match credential::resolve(explicit_token, env) {
        Ok(found) => {
            let message = format!("{} from {}", found.credential.masked(), found.source);
            let result = match found.format {
                credential::TokenFormat::Conventional => {
                    CheckResult::pass("GitHub token", "credential", &message)
                }
                credential::TokenFormat::Unrecognized => CheckResult::warning(
                    "GitHub token",
                    "credential",
                    &format!("{} (unrecognized format, will be used anyway)", message),
                ),
            };
            results.push(result);
        }
        Err(e) => results.push(
            CheckResult::error("GitHub token", "credential", &e.to_string()).with_fix(&e.hint()),
        ),
    }

    let checker = HealthChecker::new(runtime, true);
    results.extend(checker.report(&LaunchTarget::from_settings(settings)));

    if !settings.health_check {
        results.push(CheckResult::info(
            "Launch health checks",
            "config",
            "disabled for launches; enable with --health-check or HEALTH_CHECK=true",
        ));
    }
    results
}

fn output_text(results: &[CheckResult]) {
    let mut errors = 0;
    let mut warnings = 0;
    let mut passed = 0;

    for result in results {
        let icon = match result.severity {
            CheckSeverity::Pass => {
                passed += 1;
                "✓".green()
            }
            CheckSeverity::Warning => {
                warnings += 1;
                "⚠".yellow()
            }
            CheckSeverity::Error => {
                errors += 1;
                "✗".red()
            }
            CheckSeverity::Info => "ℹ".blue(),
        };

        println!("{} {}", icon, result.name);
        if !result.message.is_empty() {
            println!("  {}", result.message.dimmed());
        }
        if let Some(ref fix) = result.suggested_fix {
            println!("  {} {}", "Fix:".cyan(), fix);
        }
    }

    println!();
    println!(
        "{}: {} passed, {} warnings, {} errors",
        "Summary".bold(),
        passed.to_string().green(),
        warnings.to_string().yellow(),
        errors.to_string().red()
    );

    if errors == 0 {
        println!();
        println!("{}", "Ready to launch.".green().bold());
    }
}

fn output_json(results: &[CheckResult], settings: &Settings, has_errors: bool) -> Result<()> {
    let issues: Vec<Issue> = results.iter().map(Issue::from).collect();
    let count = |severity: CheckSeverity| results.iter().filter(|r| r.severity == severity).count();

    let output = GhboxOutput::new("check")
        .with_success(!has_errors)
        .with_issues(issues)
        .with_data(serde_json::json!({
            "runtime": settings.runtime,
            "image": settings.image,
            "binary": settings.binary_path(),
            "summary": {
                "total": results.len(),
                "passed": count(CheckSeverity::Pass),
                "warnings": count(CheckSeverity::Warning),
                "errors": count(CheckSeverity::Error)
            }
        }));

    println!("{}", output.to_json()?);
    Ok(())
}
