//! Client configuration artifacts: the Claude Desktop JSON descriptor and the
//! Claude Code registration command.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::registry::RegistrationStatus;
use crate::credential::Credential;
use crate::utils::{shell_single_quote, write_atomic};

/// Name of the server entry in every client
pub const SERVER_NAME: &str = "github";

/// Suffix used when the user keeps an existing descriptor untouched
const ALTERNATE_SUFFIX: &str = "ghbox";

/// Default Claude Desktop configuration file
pub fn default_desktop_config() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Claude")
        .join("claude_desktop_config.json")
}

/// `{"mcpServers": {"github": {"command": ..., "args": [token]}}}`
pub fn descriptor(command: &Path, credential: &Credential) -> Value {
    let mut entry = Map::new();
    entry.insert(
        "command".to_string(),
        Value::String(command.to_string_lossy().to_string()),
    );
    entry.insert(
        "args".to_string(),
        Value::Array(vec![Value::String(credential.expose().to_string())]),
    );

    let mut servers = Map::new();
    servers.insert(SERVER_NAME.to_string(), Value::Object(entry));

    let mut root = Map::new();
    root.insert("mcpServers".to_string(), Value::Object(servers));
    Value::Object(root)
}

/// Shell-ready `claude mcp add` line embedding the command path and token
pub fn registration_command(client: &str, command: &Path, credential: &Credential) -> String {
    format!(
        "{} mcp add {} -- {} {}",
        client,
        SERVER_NAME,
        shell_single_quote(&command.to_string_lossy()),
        shell_single_quote(credential.expose())
    )
}

/// What to do when a descriptor already exists at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingArtifactChoice {
    BackupAndOverwrite,
    WriteAlternate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
}

/// `<path>.backup-YYYYmmdd-HHMMSS`
pub fn backup_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".backup-{}", now.format("%Y%m%d-%H%M%S")));
    path.with_file_name(name)
}

/// First free `<stem>.ghbox[.N].json` next to `path`
pub fn alternate_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "config".to_string());

    let first = path.with_file_name(format!("{}.{}.json", stem, ALTERNATE_SUFFIX));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| path.with_file_name(format!("{}.{}.{}.json", stem, ALTERNATE_SUFFIX, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Write the descriptor. An existing file is only replaced after a backup,
/// and without a choice it is left alone with an `AlreadyExists` error.
pub fn write_descriptor(
    path: &Path,
    descriptor: &Value,
    on_existing: Option<ExistingArtifactChoice>,
) -> io::Result<WrittenArtifact> {
    let content = serde_json::to_string_pretty(descriptor).map_err(io::Error::from)? + "\n";

    if !path.exists() {
        write_atomic(path, &content, Some(0o600))?;
        return Ok(WrittenArtifact {
            path: path.to_path_buf(),
            backup: None,
        });
    }

    match on_existing {
        None => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )),
        Some(ExistingArtifactChoice::BackupAndOverwrite) => {
            let backup = backup_path(path, Local::now());
            fs::copy(path, &backup)?;
            tracing::info!(backup = %backup.display(), "backed up existing client config");
            write_atomic(path, &content, Some(0o600))?;
            Ok(WrittenArtifact {
                path: path.to_path_buf(),
                backup: Some(backup),
            })
        }
        Some(ExistingArtifactChoice::WriteAlternate) => {
            let alternate = alternate_path(path);
            write_atomic(&alternate, &content, Some(0o600))?;
            Ok(WrittenArtifact {
                path: alternate,
                backup: None,
            })
        }
    }
}

/// Re-read a written descriptor and confirm the server entry points at `command`
pub fn verify_descriptor(path: &Path, command: &Path) -> RegistrationStatus {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return RegistrationStatus::Error(format!("cannot read {}: {}", path.display(), e)),
    };
    let value: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => return RegistrationStatus::Error(format!("invalid JSON in {}: {}", path.display(), e)),
    };

    let configured = value
        .get("mcpServers")
        .and_then(|servers| servers.get(SERVER_NAME))
        .and_then(|entry| entry.get("command"))
        .and_then(Value::as_str)
        .is_some_and(|c| Path::new(c) == command);

    if configured {
        RegistrationStatus::Configured
    } else {
        RegistrationStatus::NotConfigured
    }
}
