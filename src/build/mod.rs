//! Building the server binary from a Go source checkout
//!
//! Only the setup wizard builds. An installed copy of ghbox without a source
//! checkout cannot rebuild, and reports that as `BuildCapability::Unavailable`.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::Environment;
use crate::error::BuildError;
use crate::utils::{command_exists, run_prepared_with_timeout, CommandResult};

/// Environment variable overriding the source checkout location
pub const SOURCE_DIR_ENV: &str = "GHBOX_SOURCE_DIR";

/// Package path of the server's main package inside the checkout
const MAIN_PACKAGE: &str = "./cmd/github-mcp-server";

const BUILD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildCapability {
    Available { source_dir: PathBuf },
    Unavailable { reason: String },
}

pub trait BinaryBuilder {
    fn capability(&self) -> BuildCapability;

    /// Produce the binary at `output`
    fn build(&self, output: &Path) -> Result<(), BuildError>;
}

/// Source checkout location: flag, then `GHBOX_SOURCE_DIR`, then the per-user default
pub fn source_dir(flag: Option<&Path>, env: &Environment) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.get(SOURCE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghbox")
        .join("src")
        .join("github-mcp-server")
}

/// `go build` of a static linux binary, so it runs in any sandbox image
#[derive(Debug, Clone)]
pub struct GoSourceBuilder {
    source_dir: PathBuf,
    go: String,
    timeout: Duration,
}

impl GoSourceBuilder {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            go: "go".to_string(),
            timeout: BUILD_TIMEOUT,
        }
    }

    pub fn with_go(mut self, go: impl Into<String>) -> Self {
        self.go = go.into();
        self
    }
}

impl BinaryBuilder for GoSourceBuilder {
    fn capability(&self) -> BuildCapability {
        if !self.source_dir.join("go.mod").is_file() {
            return BuildCapability::Unavailable {
                reason: format!("no Go source checkout at {}", self.source_dir.display()),
            };
        }
        if !command_exists(&self.go) {
            return BuildCapability::Unavailable {
                reason: format!("`{}` is not on PATH", self.go),
            };
        }
        BuildCapability::Available {
            source_dir: self.source_dir.clone(),
        }
    }

    fn build(&self, output: &Path) -> Result<(), BuildError> {
        if let BuildCapability::Unavailable { reason } = self.capability() {
            return Err(BuildError::Unavailable { reason });
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::Failed {
                detail: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }

        let mut cmd = Command::new(&self.go);
        cmd.arg("build")
            .arg("-trimpath")
            .arg("-o")
            .arg(output)
            .arg(MAIN_PACKAGE)
            .current_dir(&self.source_dir)
            .env("CGO_ENABLED", "0")
            .env("GOOS", "linux")
            .env("GOARCH", go_arch(std::env::consts::ARCH));

        tracing::info!(source = %self.source_dir.display(), output = %output.display(), "building server");

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Building github-mcp-server...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = run_prepared_with_timeout(cmd, &self.go, self.timeout);
        spinner.finish_and_clear();

        match result {
            CommandResult::Success(_) => Ok(()),
            CommandResult::TimedOut => Err(BuildError::TimedOut {
                seconds: self.timeout.as_secs(),
            }),
            other => Err(BuildError::Failed {
                detail: other.failure_detail(self.timeout),
            }),
        }
    }
}

/// Go's name for a Rust target architecture
pub fn go_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}
