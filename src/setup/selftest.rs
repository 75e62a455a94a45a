//! Protocol self-test: one JSON-RPC `initialize` request, one bounded wait.

use serde::Serialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use crate::launch::LaunchSpec;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// How long to wait for the stderr reader once stdout has closed
const STDERR_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum ProbeOutcome {
    /// A response with a `result` field arrived in time
    Responded,
    /// The server answered or exited without a `result`
    NoResult(String),
    TimedOut,
    SpawnFailed(String),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Responded)
    }
}

pub trait Prober {
    fn probe(&self, spec: &LaunchSpec) -> ProbeOutcome;
}

pub fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "ghbox-setup",
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
}

/// Whether any line of `output` is a JSON object carrying a `result` field
pub fn response_has_result(output: &str) -> bool {
    output
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .any(|value| value.get("result").is_some())
}

/// Runs the assembled launch as a child with piped stdio
#[derive(Debug, Clone)]
pub struct StdioProbe {
    timeout: Duration,
}

impl StdioProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for StdioProbe {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

impl Prober for StdioProbe {
    fn probe(&self, spec: &LaunchSpec) -> ProbeOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut cmd = spec.command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ProbeOutcome::SpawnFailed(format!("{}: {}", spec.runtime(), e)),
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            stop(&mut child);
            return ProbeOutcome::SpawnFailed("child stdio was not captured".to_string());
        };
        // Both pipes are drained before the request goes out
        let lines = forward_lines(stdout);
        let stderr_tail = last_nonempty_line(stderr);

        // Closing stdin after the request lets the server exit on EOF
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = writeln!(stdin, "{}", initialize_request()) {
                tracing::debug!(error = %e, "failed to write initialize request");
            }
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match lines.recv_timeout(remaining) {
                Ok(line) if response_has_result(&line) => {
                    stop(&mut child);
                    return ProbeOutcome::Responded;
                }
                Ok(line) => tracing::debug!(line = %line, "ignoring non-result output"),
                Err(RecvTimeoutError::Timeout) => {
                    stop(&mut child);
                    return ProbeOutcome::TimedOut;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // stdout closed without a result
        let remaining = deadline.saturating_duration_since(Instant::now());
        match child.wait_timeout(remaining) {
            Ok(Some(_)) => {}
            _ => stop(&mut child),
        }
        let detail = stderr_tail
            .recv_timeout(STDERR_GRACE)
            .ok()
            .flatten()
            .unwrap_or_else(|| "no response on stdout".to_string());
        ProbeOutcome::NoResult(detail)
    }
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Forward each line of `source` over a channel until EOF
fn forward_lines<R: Read + Send + 'static>(source: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Read `source` to EOF, then send the last non-blank line
fn last_nonempty_line<R: Read + Send + 'static>(source: R) -> Receiver<Option<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        let mut last = None;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if !line.is_empty() {
                        last = Some(line.to_string());
                    }
                }
            }
        }
        let _ = tx.send(last);
    });
    rx
}
