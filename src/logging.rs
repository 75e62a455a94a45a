use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Variable whose directives override the configured level
pub const FILTER_ENV: &str = "RUST_LOG";

/// Pick the filter: `rust_log` when it parses, else `default_filter`, else `info`.
pub fn build_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(default_filter).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// `rust_log` comes from the caller's environment snapshot. Everything goes to
/// stderr: once the server is launched, stdout belongs to the MCP stream.
pub fn init(rust_log: Option<&str>, default_filter: &str) {
    let result = fmt()
        .with_env_filter(build_filter(rust_log, default_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .try_init();

    // Already installed (tests, or a second call)
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_wins_over_configured_level() {
        assert_eq!(build_filter(Some("warn"), "debug").to_string(), "warn");
    }

    #[test]
    fn test_configured_level_without_rust_log() {
        assert_eq!(build_filter(None, "debug").to_string(), "debug");
    }
}
