use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::checks::{HealthChecker, LaunchTarget};
use crate::config::{ConfigOverrides, Environment};
use crate::credential;
use crate::launch::LaunchSpec;
use crate::output::{GhboxOutput, OutputFormat};
use crate::runtime::CliRuntime;

/// Everything the launcher was told on the command line
#[derive(Debug, Clone, Default)]
pub struct LaunchArgs {
    pub token: Option<String>,
    pub from_env: bool,
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub save_config: bool,
    pub check: bool,
    pub dry_run: bool,
    pub server_args: Vec<String>,
}

impl LaunchArgs {
    /// The positional token, unless `--from-env` restricts resolution to the environment
    fn explicit_token(&self) -> Option<&str> {
        if self.from_env {
            None
        } else {
            self.token.as_deref()
        }
    }
}

/// Resolve, check, assemble, then hand over to the sandboxed server.
///
/// Stdout is reserved for the MCP stream, so any notice on the launch path
/// goes to stderr. Only `--check` and `--dry-run` print reports to stdout.
pub fn run(args: LaunchArgs, env: &Environment, format: OutputFormat) -> Result<()> {
    let (settings, config_path) = super::prepare(args.config.as_deref(), env, &args.overrides);

    if args.save_config {
        settings
            .to_record()
            .save(&config_path)
            .context("Failed to save configuration")?;
        tracing::info!(path = %config_path.display(), "saved configuration");
        if format == OutputFormat::Text {
            eprintln!(
                "{} Saved configuration to {}",
                "✓".green(),
                config_path.display()
            );
        }
    }

    let runtime = CliRuntime::new(settings.runtime.as_str());

    if args.check {
        return super::check::run(&settings, &runtime, args.explicit_token(), env, format);
    }

    let resolved = credential::resolve(args.explicit_token(), env)?;

    let checker = HealthChecker::new(&runtime, settings.health_check);
    let preflight = checker.check(&LaunchTarget::from_settings(&settings))?;
    for repair in preflight.repairs() {
        tracing::warn!(command = %repair.command, "{}", repair.description);
    }

    let spec = LaunchSpec::assemble(&preflight, &settings, resolved.credential, args.server_args);

    if args.dry_run {
        return print_dry_run(&spec, preflight.was_checked(), &resolved.source.to_string(), format);
    }

    let never = spec.exec()?;
    match never {}
}

fn print_dry_run(spec: &LaunchSpec, checked: bool, source: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = GhboxOutput::new("launch").with_data(serde_json::json!({
                "dry_run": true,
                "runtime": spec.runtime(),
                "image": spec.image(),
                "args": spec.runtime_args(),
                "credential_source": source,
                "health_checked": checked,
            }));
            println!("{}", output.to_json()?);
        }
        OutputFormat::Text => {
            println!("{}", spec.redacted_command_line());
        }
    }
    Ok(())
}
