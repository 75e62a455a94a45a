use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::build::{self, GoSourceBuilder};
use crate::config::{ConfigOverrides, Environment};
use crate::output::{GhboxOutput, OutputFormat};
use crate::runtime::CliRuntime;
use crate::setup::artifacts::default_desktop_config;
use crate::setup::prompt::DialoguerPrompter;
use crate::setup::registry::ClaudeCli;
use crate::setup::selftest::{ProbeOutcome, StdioProbe};
use crate::setup::{Collaborators, SetupOptions, SetupSession, Verdict, Wizard};

#[derive(Debug, Clone)]
pub struct SetupArgs {
    pub config: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub desktop_config: Option<PathBuf>,
    /// Launcher executable the clients should run
    pub command_path: PathBuf,
}

pub fn run(args: SetupArgs, env: &Environment, format: OutputFormat) -> Result<()> {
    let (settings, _) = super::prepare(args.config.as_deref(), env, &ConfigOverrides::default());

    if format == OutputFormat::Text {
        println!("{}", "GitHub MCP server setup".bold().cyan());
        println!();
    }

    let runtime = CliRuntime::new(settings.runtime.as_str());
    let builder = GoSourceBuilder::new(build::source_dir(args.source_dir.as_deref(), env));
    let registry = ClaudeCli::default();
    let prober = StdioProbe::default();
    let mut prompter = DialoguerPrompter::new();

    let options = SetupOptions {
        settings,
        env: env.clone(),
        command_path: args.command_path,
        desktop_config: args.desktop_config.unwrap_or_else(default_desktop_config),
    };
    let deps = Collaborators {
        runtime: &runtime,
        builder: &builder,
        registry: &registry,
        prober: &prober,
    };

    let session = Wizard::new(options, deps, &mut prompter).run()?;

    match format {
        OutputFormat::Json => output_json(&session)?,
        OutputFormat::Text => output_text(&session),
    }
    Ok(())
}

fn output_text(session: &SetupSession) {
    println!();
    println!("{}", "Summary".bold());

    if session.built_binary {
        println!("{} Server binary built from source", "✓".green());
    }
    if let Some(source) = &session.credential_source {
        println!("{} GitHub token from {}", "✓".green(), source);
    }

    match (&session.self_test, &session.self_test_error) {
        (Some(ProbeOutcome::Responded), _) => {
            println!("{} Self-test: server answered the initialize request", "✓".green())
        }
        (Some(outcome), _) => println!("{} Self-test: {}", "⚠".yellow(), describe_probe(outcome)),
        (None, Some(error)) => println!("{} Self-test not run: {}", "⚠".yellow(), error),
        (None, None) => println!("{} Self-test skipped", "ℹ".blue()),
    }

    for report in &session.reports {
        let verdict = report.verdict();
        let icon = match verdict {
            Verdict::Verified => "✓".green(),
            Verdict::ReportedButUnverified(_) => "⚠".yellow(),
            Verdict::Unverified(_) => "✗".red(),
        };
        println!("{} {}: {}", icon, report.target, verdict.describe());
        if let Some(path) = &report.artifact {
            println!("  {}", path.display().to_string().dimmed());
        }
        if let Some(backup) = &report.backup {
            println!("  {} {}", "Backup:".cyan(), backup.display());
        }
        if let Some(detail) = &report.detail {
            println!("  {}", detail.dimmed());
        }
    }

    if let Some(printed) = &session.printed {
        println!();
        println!("{}", "Claude Desktop configuration:".bold());
        println!("{}", printed.descriptor);
        println!();
        println!("{}", "Claude Code registration:".bold());
        println!("{}", printed.registration_command);
        println!();
        println!("{} Nothing was written; apply the configuration above by hand.", "→".cyan());
    } else if session.all_verified() {
        println!();
        println!("{}", "Setup complete. Restart your client to pick up the server.".green().bold());
    }
}

fn describe_probe(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Responded => "responded".to_string(),
        ProbeOutcome::NoResult(detail) => format!("no protocol response ({})", detail),
        ProbeOutcome::TimedOut => "no response before the timeout".to_string(),
        ProbeOutcome::SpawnFailed(detail) => format!("could not start the sandbox ({})", detail),
    }
}

fn output_json(session: &SetupSession) -> Result<()> {
    let verdicts: Vec<_> = session.reports.iter().map(|r| r.verdict()).collect();
    let output = GhboxOutput::new("setup")
        .with_success(session.all_verified())
        .with_data(serde_json::json!({
            "session": session,
            "verdicts": verdicts,
        }));
    println!("{}", output.to_json()?);
    Ok(())
}
