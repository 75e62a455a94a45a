//! Effective settings: flags over environment over stored record over defaults.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{parse_bool, ConfigKey, ConfigRecord};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "GHBOX_CONFIG";

/// Snapshot of the process environment.
///
/// Captured once by each binary's `main` and handed to the components that need
/// it, so nothing below the entry point reads `std::env` on its own.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v): (OsString, OsString)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating blank values as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Values given on the command line. `None` leaves the lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub binary_dir: Option<PathBuf>,
    pub binary_name: Option<String>,
    pub image: Option<String>,
    pub runtime: Option<String>,
    pub log_level: Option<String>,
    pub debug: Option<bool>,
    pub health_check: Option<bool>,
    pub memory_limit: Option<String>,
    pub cpu_limit: Option<String>,
}

impl ConfigOverrides {
    fn value(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::BinaryDir => self
                .binary_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            ConfigKey::BinaryName => self.binary_name.clone(),
            ConfigKey::SandboxImage => self.image.clone(),
            ConfigKey::Runtime => self.runtime.clone(),
            ConfigKey::LogLevel => self.log_level.clone(),
            ConfigKey::Debug => self.debug.map(|b| b.to_string()),
            ConfigKey::HealthCheck => self.health_check.map(|b| b.to_string()),
            ConfigKey::MemoryLimit => self.memory_limit.clone(),
            ConfigKey::CpuLimit => self.cpu_limit.clone(),
        }
    }
}

/// Typed, fully resolved configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub binary_dir: PathBuf,
    pub binary_name: String,
    pub image: String,
    pub runtime: String,
    pub log_level: String,
    pub debug: bool,
    pub health_check: bool,
    pub memory_limit: Option<String>,
    pub cpu_limit: Option<String>,
}

impl Settings {
    pub fn resolve(record: &ConfigRecord, env: &Environment, overrides: &ConfigOverrides) -> Self {
        let mut layered = record.clone();
        for key in ConfigKey::ALL {
            if let Some(value) = env.get(key.env_var()) {
                layered.set(key, value);
            }
            if let Some(value) = overrides.value(key) {
                layered.set(key, value);
            }
        }
        Self::from_record(&layered)
    }

    pub fn from_record(record: &ConfigRecord) -> Self {
        let defaults = ConfigRecord::default();
        let text = |key: ConfigKey| -> String {
            record
                .get(key)
                .or_else(|| defaults.get(key))
                .unwrap_or_default()
                .to_string()
        };

        Self {
            binary_dir: PathBuf::from(text(ConfigKey::BinaryDir)),
            binary_name: text(ConfigKey::BinaryName),
            image: text(ConfigKey::SandboxImage),
            runtime: text(ConfigKey::Runtime),
            log_level: text(ConfigKey::LogLevel),
            debug: record.get(ConfigKey::Debug).map(parse_bool).unwrap_or(false),
            health_check: record
                .get(ConfigKey::HealthCheck)
                .map(parse_bool)
                .unwrap_or(false),
            memory_limit: record.get(ConfigKey::MemoryLimit).map(str::to_string),
            cpu_limit: record.get(ConfigKey::CpuLimit).map(str::to_string),
        }
    }

    /// Convert back into a storable record. Credentials are not part of settings.
    pub fn to_record(&self) -> ConfigRecord {
        let mut record = ConfigRecord::default();
        record.set(ConfigKey::BinaryDir, self.binary_dir.to_string_lossy());
        record.set(ConfigKey::BinaryName, self.binary_name.as_str());
        record.set(ConfigKey::SandboxImage, self.image.as_str());
        record.set(ConfigKey::Runtime, self.runtime.as_str());
        record.set(ConfigKey::LogLevel, self.log_level.as_str());
        record.set(ConfigKey::Debug, self.debug.to_string());
        record.set(ConfigKey::HealthCheck, self.health_check.to_string());
        match &self.memory_limit {
            Some(limit) => record.set(ConfigKey::MemoryLimit, limit.as_str()),
            None => record.remove(ConfigKey::MemoryLimit),
        }
        match &self.cpu_limit {
            Some(limit) => record.set(ConfigKey::CpuLimit, limit.as_str()),
            None => record.remove(ConfigKey::CpuLimit),
        }
        record
    }

    /// Host path of the server binary
    pub fn binary_path(&self) -> PathBuf {
        self.binary_dir.join(&self.binary_name)
    }

    /// Log filter directive: debug toggle wins over the configured level
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

/// Config file location: flag, then `GHBOX_CONFIG`, then the per-user default
pub fn config_path(flag: Option<&Path>, env: &Environment) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(path) = env.get(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghbox")
        .join("config")
}
