//! ghbox - sandboxed launcher and setup wizard for the GitHub MCP server
//! This library holds everything behind the two binaries: configuration,
//! credential resolution, health checks, launch assembly and the setup wizard.

pub mod build;
pub mod checks;
pub mod commands;
pub mod config;
pub mod credential;
pub mod error;
pub mod launch;
pub mod logging;
pub mod output;
pub mod repair;
pub mod runtime;
pub mod setup;
pub mod utils;

// Re-export main types for convenience
pub use checks::{CheckResult, CheckSeverity, HealthChecker, LaunchTarget, Preflight};
pub use config::{ConfigKey, ConfigOverrides, ConfigRecord, Environment, Settings};
pub use credential::{Credential, CredentialSource, ResolvedCredential};
pub use error::{BuildError, ConfigError, CredentialError, HealthCheckError, LaunchError, SetupError};
pub use launch::LaunchSpec;
pub use output::{GhboxOutput, Issue, OutputFormat};
pub use runtime::{CliRuntime, ContainerRuntime};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
