use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use ghbox::commands::launch::{self, LaunchArgs};
use ghbox::config::{ConfigOverrides, Environment};
use ghbox::error::hint_for;
use ghbox::output::{error_json, OutputFormat};

/// ghbox - run the GitHub MCP server inside a container sandbox
/// Resolves the token, optionally checks the sandbox, then replaces itself
/// with the containerized server speaking MCP over stdio.
#[derive(Parser)]
#[command(name = "ghbox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GitHub personal access token (otherwise read from the environment)
    #[arg(value_name = "TOKEN", conflicts_with = "from_env")]
    token: Option<String>,

    /// Read the token from GITHUB_PERSONAL_ACCESS_TOKEN or GITHUB_TOKEN only
    #[arg(long)]
    from_env: bool,

    /// Config file (default: GHBOX_CONFIG or the per-user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the server binary, mounted read-only into the sandbox
    #[arg(long, value_name = "DIR")]
    binary_dir: Option<PathBuf>,

    /// File name of the server binary inside --binary-dir
    #[arg(long, value_name = "NAME")]
    binary_name: Option<String>,

    /// Sandbox image
    #[arg(long)]
    image: Option<String>,

    /// Container runtime command
    #[arg(long)]
    runtime: Option<String>,

    /// Memory limit passed to the runtime (e.g. 512M)
    #[arg(long)]
    memory: Option<String>,

    /// CPU limit passed to the runtime (e.g. 1.5)
    #[arg(long)]
    cpus: Option<String>,

    /// Log filter (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Verify runtime, binary and image before launching
    #[arg(long)]
    health_check: bool,

    /// Store the effective settings (never the token) in the config file
    #[arg(long)]
    save_config: bool,

    /// Run all checks, print a report and exit
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,

    /// Print the container command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Output format for --check and --dry-run
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Extra arguments for the server, after `--`
    #[arg(last = true, value_name = "SERVER_ARGS")]
    server_args: Vec<String>,
}

impl Cli {
    fn into_launch_args(self) -> (LaunchArgs, OutputFormat) {
        let overrides = ConfigOverrides {
            binary_dir: self.binary_dir,
            binary_name: self.binary_name,
            image: self.image,
            runtime: self.runtime,
            log_level: self.log_level,
            debug: self.debug.then_some(true),
            health_check: self.health_check.then_some(true),
            memory_limit: self.memory,
            cpu_limit: self.cpus,
        };
        let args = LaunchArgs {
            token: self.token,
            from_env: self.from_env,
            config: self.config,
            overrides,
            save_config: self.save_config,
            check: self.check,
            dry_run: self.dry_run,
            server_args: self.server_args,
        };
        (args, self.format)
    }
}

fn main() {
    let cli = Cli::parse();
    let env = Environment::capture();
    let (args, format) = cli.into_launch_args();

    if let Err(e) = launch::run(args, &env, format) {
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
