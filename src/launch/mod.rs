//! Launch assembly for the sandboxed server
//!
//! A [`LaunchSpec`] is built fresh for each invocation from a [`Preflight`],
//! the resolved [`Settings`] and the credential. [`LaunchSpec::exec`] then hands
//! the current process over to the container runtime; on success it never
//! returns.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::checks::Preflight;
use crate::config::Settings;
use crate::credential::{Credential, PRIMARY_TOKEN_ENV};
use crate::error::LaunchError;

/// Directory inside the sandbox where the binary directory is mounted
pub const SANDBOX_DIR: &str = "/app";

/// First server argument, selecting the stdin/stdout transport
pub const STDIO_MARKER: &str = "stdio";

/// Host directory bound into the sandbox. Whole directories only: the runtime
/// cannot mount single files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host_dir: PathBuf,
    pub sandbox_dir: String,
    pub read_only: bool,
}

impl VolumeMount {
    /// `host:sandbox[:ro]` as understood by `--volume`
    pub fn to_arg(&self) -> String {
        let mut arg = format!("{}:{}", self.host_dir.display(), self.sandbox_dir);
        if self.read_only {
            arg.push_str(":ro");
        }
        arg
    }
}

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    runtime: String,
    image: String,
    binary_name: String,
    mount: VolumeMount,
    credential: Credential,
    memory_limit: Option<String>,
    cpu_limit: Option<String>,
    passthrough: Vec<String>,
}

impl LaunchSpec {
    pub fn assemble(
        preflight: &Preflight,
        settings: &Settings,
        credential: Credential,
        passthrough: Vec<String>,
    ) -> Self {
        tracing::debug!(
            checked = preflight.was_checked(),
            repairs = preflight.repairs().len(),
            "assembling launch"
        );

        Self {
            runtime: settings.runtime.clone(),
            image: settings.image.clone(),
            binary_name: settings.binary_name.clone(),
            mount: VolumeMount {
                host_dir: absolute_dir(&settings.binary_dir),
                sandbox_dir: SANDBOX_DIR.to_string(),
                read_only: true,
            },
            credential,
            memory_limit: settings.memory_limit.clone().filter(|v| !v.trim().is_empty()),
            cpu_limit: settings.cpu_limit.clone().filter(|v| !v.trim().is_empty()),
            passthrough,
        }
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn mount(&self) -> &VolumeMount {
        &self.mount
    }

    /// Path of the server binary as seen inside the sandbox
    pub fn sandbox_binary(&self) -> String {
        format!("{}/{}", self.mount.sandbox_dir, self.binary_name)
    }

    /// Arguments handed to the runtime. The credential is forwarded by name
    /// only; its value travels in the runtime's environment.
    pub fn runtime_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            "--volume".to_string(),
            self.mount.to_arg(),
            "--env".to_string(),
            PRIMARY_TOKEN_ENV.to_string(),
        ];

        if let Some(memory) = &self.memory_limit {
            args.push("--memory".to_string());
            args.push(memory.clone());
        }
        if let Some(cpus) = &self.cpu_limit {
            args.push("--cpus".to_string());
            args.push(cpus.clone());
        }

        args.push(self.image.clone());
        args.push(self.sandbox_binary());
        args.push(STDIO_MARKER.to_string());
        args.extend(self.passthrough.iter().cloned());
        args
    }

    /// Runtime command with the credential injected into its environment.
    /// Stdio is left to the caller (inherited by default).
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.runtime);
        cmd.args(self.runtime_args())
            .env(PRIMARY_TOKEN_ENV, self.credential.expose());
        cmd
    }

    /// Full command line with the credential masked, for dry runs
    pub fn redacted_command_line(&self) -> String {
        let mut parts = vec![format!("{}=****", PRIMARY_TOKEN_ENV), self.runtime.clone()];
        parts.extend(self.runtime_args().into_iter().map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                crate::utils::shell_single_quote(&arg)
            } else {
                arg
            }
        }));
        parts.join(" ")
    }

    /// Replace the current process with the sandboxed server.
    ///
    /// Never returns on success; stdin/stdout/stderr are inherited so the
    /// MCP stream passes through untouched. There is no retry.
    #[cfg(unix)]
    pub fn exec(self) -> Result<Infallible, LaunchError> {
        use std::os::unix::process::CommandExt;

        tracing::info!(runtime = %self.runtime, image = %self.image, "handing over to sandboxed server");
        let source = self.command().exec();
        Err(LaunchError::ExecFailed {
            program: self.runtime,
            source,
        })
    }

    /// Without `exec`, run the server as a child and exit with its status.
    #[cfg(not(unix))]
    pub fn exec(self) -> Result<Infallible, LaunchError> {
        tracing::info!(runtime = %self.runtime, image = %self.image, "starting sandboxed server");
        let status = self
            .command()
            .status()
            .map_err(|source| LaunchError::ExecFailed {
                program: self.runtime.clone(),
                source,
            })?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

fn absolute_dir(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}
