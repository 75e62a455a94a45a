//! Interactive setup for ghbox
//!
//! Checks the sandbox runtime, builds the server when needed, resolves the
//! token, optionally self-tests the launch, and configures Claude Desktop
//! and/or Claude Code to run `ghbox`.

use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;

use ghbox::commands::setup::{self, SetupArgs};
use ghbox::config::Environment;
use ghbox::error::hint_for;
use ghbox::output::{error_json, OutputFormat};

#[derive(Parser)]
#[command(name = "ghbox-setup")]
#[command(author, version, about = "Set up the sandboxed GitHub MCP server for Claude", long_about = None)]
struct Cli {
    /// Config file (default: GHBOX_CONFIG or the per-user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Go source checkout of github-mcp-server (default: GHBOX_SOURCE_DIR)
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Claude Desktop configuration file to write
    #[arg(long, value_name = "PATH")]
    desktop_config: Option<PathBuf>,

    /// Launcher the clients should run (default: the `ghbox` next to this binary)
    #[arg(long, value_name = "PATH")]
    command_path: Option<PathBuf>,

    /// Output format for the summary
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// `ghbox` installed alongside `ghbox-setup`
fn sibling_launcher() -> PathBuf {
    let name = format!("ghbox{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn main() {
    let cli = Cli::parse();
    let env = Environment::capture();
    let format = cli.format;

    let result = if std::io::stdin().is_terminal() {
        let args = SetupArgs {
            config: cli.config,
            source_dir: cli.source_dir,
            desktop_config: cli.desktop_config,
            command_path: cli.command_path.unwrap_or_else(sibling_launcher),
        };
        setup::run(args, &env, format)
    } else {
        Err(anyhow::anyhow!(
            "ghbox-setup is interactive and needs a terminal on stdin"
        ))
    };

    if let Err(e) = result {
        let hint = hint_for(&e);
        if format == OutputFormat::Json {
            eprintln!("{}", error_json(&e, hint.as_deref()));
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(hint) = hint {
                eprintln!("{} {}", "Hint:".cyan().bold(), hint);
            }
        }
        std::process::exit(1);
    }
}
