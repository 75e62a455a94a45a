//! Container runtime seam
//! The health checker and the self-test only need to know whether the runtime
//! command exists and whether it can start a container from an image.

use std::time::Duration;

use crate::utils::{command_exists, run_command_with_timeout, CommandResult, LONG_COMMAND_TIMEOUT};

pub trait ContainerRuntime {
    /// Command name used to invoke the runtime (`container`, `docker`, ...)
    fn program(&self) -> &str;

    /// Whether the runtime command is present on the host
    fn is_available(&self) -> bool;

    /// Start a throwaway container from `image` running a no-op command
    fn run_noop(&self, image: &str) -> CommandResult;

    /// Upper bound used by `run_noop`, reported in failure messages
    fn noop_timeout(&self) -> Duration {
        LONG_COMMAND_TIMEOUT
    }
}

/// Runtime driven through its command-line interface
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
    timeout: Duration,
}

impl CliRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: LONG_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ContainerRuntime for CliRuntime {
    fn program(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn run_noop(&self, image: &str) -> CommandResult {
        tracing::debug!(runtime = %self.program, image, "probing image with a no-op container");
        run_command_with_timeout(&self.program, &["run", "--rm", image, "true"], self.timeout)
    }

    fn noop_timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_runtime_is_unavailable() {
        let runtime = CliRuntime::new("definitely-not-a-runtime-xyz");
        assert!(!runtime.is_available());
        assert_eq!(runtime.program(), "definitely-not-a-runtime-xyz");
    }

    #[test]
    fn test_noop_on_missing_runtime_is_spawn_error() {
        let runtime = CliRuntime::new("definitely-not-a-runtime-xyz");
        assert!(matches!(
            runtime.run_noop("alpine:latest"),
            CommandResult::SpawnError(_)
        ));
    }
}
