pub mod check;
pub mod launch;
pub mod setup;

use std::path::{Path, PathBuf};

use crate::config::{config_path, ConfigOverrides, ConfigRecord, Environment, Settings};
use crate::error::ConfigError;
use crate::logging;

/// Load the stored record, resolve effective settings and install logging.
///
/// A broken config file is not fatal: defaults are used and the problem is
/// logged once the subscriber is up.
pub(crate) fn prepare(
    config_flag: Option<&Path>,
    env: &Environment,
    overrides: &ConfigOverrides,
) -> (Settings, PathBuf) {
    let path = config_path(config_flag, env);
    let (record, load_error) = ConfigRecord::load_or_default(&path);
    let settings = Settings::resolve(&record, env, overrides);

    logging::init(env.get(logging::FILTER_ENV), settings.log_filter());
    tracing::debug!(config = %path.display(), "configuration resolved");
    if let Some(e) = load_error {
        warn_config(&e);
    }

    (settings, path)
}

fn warn_config(error: &ConfigError) {
    tracing::warn!(hint = %error.hint(), "{}; using defaults", error);
}
