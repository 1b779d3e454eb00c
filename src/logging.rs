//! Logging bootstrap
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! The filter comes from `--verbose`, then `CCPM_LOG`, then the configured
//! level, then `warn`.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a log filter directive
pub const LOG_ENV: &str = "CCPM_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "debug";

/// Picks the filter directive to use
pub fn directive(verbose: bool, env: Option<String>, configured: Option<&str>) -> String {
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    env.filter(|value| !value.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Installs the global subscriber
///
/// When `log_file` is given, the same events are also appended to it as
/// plain text.
pub fn init(verbose: bool, configured: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let directive = directive(verbose, std::env::var(LOG_ENV).ok(), configured);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{}'", directive))?;

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_forces_debug() {
        assert_eq!(directive(true, Some("error".into()), Some("info")), "debug");
    }

    #[test]
    fn env_beats_config() {
        assert_eq!(directive(false, Some("ccpm=trace".into()), Some("info")), "ccpm=trace");
        assert_eq!(directive(false, Some("  ".into()), Some("info")), "info");
    }

    #[test]
    fn falls_back_to_warn() {
        assert_eq!(directive(false, None, None), "warn");
    }

    #[test]
    fn directives_parse() {
        for d in ["warn", "debug", "ccpm=debug,warn"] {
            assert!(EnvFilter::try_new(d).is_ok());
        }
    }
}
