//! Utility functions for ghbox
//! This module provides common utilities including command execution with timeout
//! and atomic file writes.

use std::fs;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wait_timeout::ChildExt;

/// Default timeout for external commands (30 seconds)
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Short timeout for quick commands (5 seconds)
pub const SHORT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Long timeout for potentially slow commands such as image pulls (120 seconds)
pub const LONG_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of running a command with timeout
#[derive(Debug)]
pub enum CommandResult {
    /// Command completed successfully with output
    Success(Output),
    /// Command failed with output
    Failed(Output),
    /// Command timed out and was killed
    TimedOut,
    /// Command could not be started
    SpawnError(String),
}

impl CommandResult {
    /// Returns true if the command succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success(_))
    }

    /// Short human-readable reason for a non-successful result
    pub fn failure_detail(&self, timeout: Duration) -> String {
        match self {
            CommandResult::Success(_) => "succeeded".to_string(),
            CommandResult::Failed(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let code = output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                if stderr.is_empty() {
                    format!("exited with status {}", code)
                } else {
                    format!("exited with status {}: {}", code, last_line(&stderr))
                }
            }
            CommandResult::TimedOut => format!("timed out after {}s", timeout.as_secs()),
            CommandResult::SpawnError(e) => e.clone(),
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or(text)
}

/// Run a command with a timeout
///
/// # Arguments
/// * `cmd` - The command to run
/// * `args` - Arguments to pass to the command
/// * `timeout` - Maximum time to wait for the command
///
/// # Returns
/// A `CommandResult` indicating success, failure, timeout, or spawn error
pub fn run_command_with_timeout<S: AsRef<str>>(
    cmd: &str,
    args: &[S],
    timeout: Duration,
) -> CommandResult {
    let mut command = Command::new(cmd);
    command.args(args.iter().map(|a| a.as_ref()));
    run_prepared_with_timeout(command, cmd, timeout)
}

/// Run an already configured `Command` (cwd, env) with a timeout.
/// stdout and stderr are captured; stdin is closed.
pub fn run_prepared_with_timeout(mut command: Command, label: &str, timeout: Duration) -> CommandResult {
    let child = match command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => return CommandResult::SpawnError(format!("Failed to start '{}': {}", label, e)),
    };

    wait_child_with_timeout(child, label, timeout)
}

/// Wait for a spawned child with piped output, killing it on timeout
pub fn wait_child_with_timeout(mut child: Child, label: &str, timeout: Duration) -> CommandResult {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => {
            let output = match child.wait_with_output() {
                Ok(o) => o,
                Err(e) => {
                    return CommandResult::SpawnError(format!(
                        "Failed to get output from '{}': {}",
                        label, e
                    ))
                }
            };

            if status.success() {
                CommandResult::Success(output)
            } else {
                CommandResult::Failed(output)
            }
        }
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait(); // Reap the zombie process
            CommandResult::TimedOut
        }
        Err(e) => CommandResult::SpawnError(format!("Failed to wait for '{}': {}", label, e)),
    }
}

/// Check if a command can be found on PATH
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Write `content` to a temporary sibling and rename it over `path`.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &str, mode: Option<u32>) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "ghbox".to_string()),
        std::process::id(),
        ts
    ));

    fs::write(&tmp_path, content)?;
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Quote a value for a POSIX shell command line
pub fn shell_single_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_run_command_success() {
        let result = run_command_with_timeout("echo", &["hello"], SHORT_COMMAND_TIMEOUT);
        match result {
            CommandResult::Success(output) => {
                assert!(String::from_utf8_lossy(&output.stdout).contains("hello"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_run_command_spawn_error() {
        let result = run_command_with_timeout(
            "nonexistent_command_xyz_123",
            &[] as &[&str],
            SHORT_COMMAND_TIMEOUT,
        );

        assert!(matches!(result, CommandResult::SpawnError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_times_out() {
        let result = run_command_with_timeout("sleep", &["5"], Duration::from_millis(100));
        assert!(matches!(result, CommandResult::TimedOut));
        assert_eq!(result.failure_detail(Duration::from_secs(1)), "timed out after 1s");
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_detail_uses_last_stderr_line() {
        let result = run_command_with_timeout(
            "sh",
            &["-c", "echo first >&2; echo second >&2; exit 3"],
            SHORT_COMMAND_TIMEOUT,
        );
        assert_eq!(
            result.failure_detail(SHORT_COMMAND_TIMEOUT),
            "exited with status 3: second"
        );
    }

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.txt");

        write_atomic(&path, "one", None).unwrap();
        write_atomic(&path, "two", None).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_shell_single_quote() {
        assert_eq!(shell_single_quote("abc"), "'abc'");
        assert_eq!(shell_single_quote("it's"), "'it'\\''s'");
    }
}
