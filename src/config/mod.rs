//! Configuration module for ghbox
//! Handles loading and saving the flat `KEY=value` configuration record.

mod settings;

pub use settings::{config_path, ConfigOverrides, Environment, Settings, CONFIG_PATH_ENV};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::utils::write_atomic;

/// Default server binary name produced by the build
pub const DEFAULT_BINARY_NAME: &str = "github-mcp-server";

/// Default sandbox image; the server binary is static so a minimal image is enough
pub const DEFAULT_IMAGE: &str = "alpine:latest";

/// Default container runtime command
pub const DEFAULT_RUNTIME: &str = "container";

pub const DEFAULT_LOG_LEVEL: &str = "info";

const FILE_HEADER: &str = "# ghbox configuration\n# Written by `ghbox --save-config`. The GitHub token is never stored here.\n\n";

/// Keys recognized in the configuration file. Anything else is dropped on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    BinaryDir,
    BinaryName,
    SandboxImage,
    Runtime,
    LogLevel,
    Debug,
    HealthCheck,
    MemoryLimit,
    CpuLimit,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::BinaryDir,
        ConfigKey::BinaryName,
        ConfigKey::SandboxImage,
        ConfigKey::Runtime,
        ConfigKey::LogLevel,
        ConfigKey::Debug,
        ConfigKey::HealthCheck,
        ConfigKey::MemoryLimit,
        ConfigKey::CpuLimit,
    ];

    /// Name as written in the file
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::BinaryDir => "BINARY_DIR",
            ConfigKey::BinaryName => "BINARY_NAME",
            ConfigKey::SandboxImage => "SANDBOX_IMAGE",
            ConfigKey::Runtime => "RUNTIME",
            ConfigKey::LogLevel => "LOG_LEVEL",
            ConfigKey::Debug => "DEBUG",
            ConfigKey::HealthCheck => "HEALTH_CHECK",
            ConfigKey::MemoryLimit => "MEMORY_LIMIT",
            ConfigKey::CpuLimit => "CPU_LIMIT",
        }
    }

    /// Environment variable that overrides the stored value
    pub fn env_var(self) -> &'static str {
        match self {
            ConfigKey::BinaryDir => "GHBOX_BINARY_DIR",
            ConfigKey::BinaryName => "GHBOX_BINARY_NAME",
            ConfigKey::SandboxImage => "GHBOX_IMAGE",
            ConfigKey::Runtime => "GHBOX_RUNTIME",
            ConfigKey::LogLevel => "GHBOX_LOG_LEVEL",
            ConfigKey::Debug => "GHBOX_DEBUG",
            ConfigKey::HealthCheck => "GHBOX_HEALTH_CHECK",
            ConfigKey::MemoryLimit => "GHBOX_MEMORY",
            ConfigKey::CpuLimit => "GHBOX_CPUS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Optional keys have no default; absent means "runtime default"
    pub fn is_optional(self) -> bool {
        matches!(self, ConfigKey::MemoryLimit | ConfigKey::CpuLimit)
    }

    fn default_value(self) -> Option<String> {
        match self {
            ConfigKey::BinaryDir => Some(default_binary_dir().to_string_lossy().to_string()),
            ConfigKey::BinaryName => Some(DEFAULT_BINARY_NAME.to_string()),
            ConfigKey::SandboxImage => Some(DEFAULT_IMAGE.to_string()),
            ConfigKey::Runtime => Some(DEFAULT_RUNTIME.to_string()),
            ConfigKey::LogLevel => Some(DEFAULT_LOG_LEVEL.to_string()),
            ConfigKey::Debug | ConfigKey::HealthCheck => Some("false".to_string()),
            ConfigKey::MemoryLimit | ConfigKey::CpuLimit => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default per-user directory for the server binary
pub fn default_binary_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghbox")
        .join("bin")
}

/// Persisted configuration: recognized keys mapped to raw string values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    values: BTreeMap<ConfigKey, String>,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        let values = ConfigKey::ALL
            .into_iter()
            .filter_map(|key| key.default_value().map(|value| (key, value)))
            .collect();
        Self { values }
    }
}

impl ConfigRecord {
    /// Load the record from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&content, path)
    }

    /// Load the record, falling back to defaults on any error.
    /// The error is handed back so the caller can report it once logging is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(record) => (record, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Parse file content on top of the defaults
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut record = Self::default();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let Some((name, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    line: index + 1,
                    content: raw.to_string(),
                });
            };

            let Some(key) = ConfigKey::from_name(name.trim()) else {
                tracing::debug!(key = name.trim(), "ignoring unrecognized config key");
                continue;
            };

            let value = unquote(value.trim());
            if value.is_empty() {
                if key.is_optional() {
                    record.values.remove(&key);
                }
                continue;
            }
            record.values.insert(key, value.to_string());
        }

        Ok(record)
    }

    /// Render the full record, header included
    pub fn render(&self) -> String {
        let mut out = String::from(FILE_HEADER);
        for (key, value) in &self.values {
            out.push_str(key.name());
            out.push('=');
            out.push_str(&quote(value));
            out.push('\n');
        }
        out
    }

    /// Write the freshly rendered record over `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        write_atomic(path, &self.render(), Some(0o600)).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Set a value; an empty value clears an optional key and is ignored otherwise.
    ///
    /// Values with control characters are refused and the previous value kept:
    /// the file is one `KEY=value` per line.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = value.into();
        if value.chars().any(char::is_control) {
            tracing::warn!(key = key.name(), "ignoring value containing control characters");
            return;
        }
        if value.trim().is_empty() {
            if key.is_optional() {
                self.values.remove(&key);
            }
            return;
        }
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: ConfigKey) {
        if key.is_optional() {
            self.values.remove(&key);
        }
    }

    pub fn get_bool(&self, key: ConfigKey) -> bool {
        self.get(key).map(parse_bool).unwrap_or(false)
    }
}

/// Parse a boolean flag value (`1`, `true`, `yes`, `on`)
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn quote(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'');
    if !needs_quotes {
        value.to_string()
    } else if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}
