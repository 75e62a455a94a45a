//! Error types for ghbox
//! Each component returns its own error kind; the binaries print the message
//! plus the single remediation line from `hint()`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::credential::{PRIMARY_TOKEN_ENV, SECONDARY_TOKEN_ENV};

/// Problems reading or writing the flat configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed line {line} in {}: expected KEY=value, found {content:?}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

impl ConfigError {
    pub fn hint(&self) -> String {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Malformed { path, .. } => format!(
                "Fix or delete {} (defaults are used meanwhile)",
                path.display()
            ),
            ConfigError::Write { path, .. } => format!(
                "Check that the directory of {} is writable",
                path.display()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(
        "no GitHub token found: pass it as the first argument or export {} (or {})",
        PRIMARY_TOKEN_ENV,
        SECONDARY_TOKEN_ENV
    )]
    Missing,
}

impl CredentialError {
    pub fn hint(&self) -> String {
        format!(
            "Run `ghbox <token>` or `export {}=<token>` and then `ghbox --from-env`",
            PRIMARY_TOKEN_ENV
        )
    }
}

#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("container runtime `{runtime}` was not found on PATH")]
    RuntimeUnavailable { runtime: String },

    #[error("server binary not found at {}", path.display())]
    BinaryMissing { path: PathBuf },

    #[error("server binary at {} is not executable and could not be repaired: {source}", path.display())]
    BinaryNotExecutable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("container image `{image}` could not be started: {detail}")]
    ImageUnreachable { image: String, detail: String },
}

impl HealthCheckError {
    pub fn hint(&self) -> String {
        match self {
            HealthCheckError::RuntimeUnavailable { runtime } => format!(
                "Install `{}` or point --runtime at an installed container runtime",
                runtime
            ),
            HealthCheckError::BinaryMissing { .. } => {
                "Run `ghbox-setup` to build the server, or pass --binary-dir/--binary-name".to_string()
            }
            HealthCheckError::BinaryNotExecutable { path, .. } => {
                format!("Run `chmod +x {}` manually", path.display())
            }
            HealthCheckError::ImageUnreachable { image, .. } => format!(
                "Check that the runtime is started and can pull `{}`, or pass --image",
                image
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot build the server here: {reason}")]
    Unavailable { reason: String },

    #[error("build was declined and no server binary exists")]
    Declined,

    #[error("build failed: {detail}")]
    Failed { detail: String },

    #[error("build timed out after {seconds}s")]
    TimedOut { seconds: u64 },
}

impl BuildError {
    pub fn hint(&self) -> String {
        match self {
            BuildError::Unavailable { .. } => {
                "Install a prebuilt server binary into the configured binary directory".to_string()
            }
            BuildError::Declined => "Re-run ghbox-setup and accept the build step".to_string(),
            BuildError::Failed { .. } | BuildError::TimedOut { .. } => {
                "Check the Go toolchain (`go version`) and the source checkout".to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start `{program}`: {source}")]
    ExecFailed {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn hint(&self) -> String {
        match self {
            LaunchError::ExecFailed { program, .. } => {
                format!("Enable --health-check to diagnose `{}`", program)
            }
        }
    }
}

/// Terminal errors of the setup wizard. Component errors are surfaced verbatim.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    HealthCheck(#[from] HealthCheckError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SetupError {
    pub fn hint(&self) -> String {
        match self {
            SetupError::Credential(e) => e.hint(),
            SetupError::HealthCheck(e) => e.hint(),
            SetupError::Build(e) => e.hint(),
            SetupError::Config(e) => e.hint(),
            SetupError::Prompt(_) => "Run ghbox-setup from an interactive terminal".to_string(),
            SetupError::Io(_) | SetupError::Json(_) => {
                "Check permissions on the client configuration directory".to_string()
            }
        }
    }
}

/// Find the most specific remediation hint inside an `anyhow` chain.
pub fn hint_for(err: &anyhow::Error) -> Option<String> {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<CredentialError>() {
            return Some(e.hint());
        }
        if let Some(e) = cause.downcast_ref::<HealthCheckError>() {
            return Some(e.hint());
        }
        if let Some(e) = cause.downcast_ref::<LaunchError>() {
            return Some(e.hint());
        }
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            return Some(e.hint());
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return Some(e.hint());
        }
        if let Some(e) = cause.downcast_ref::<SetupError>() {
            return Some(e.hint());
        }
    }
    None
}
