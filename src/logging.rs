//! Log configuration

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

const DEFAULT_ENV_CONFIG: &str = "info";
const VERBOSE_ENV_CONFIG: &str = "info,gh_pr_triage=debug";

/// Filter directives in effect, `RUST_LOG` taking precedence
fn filter_directives(verbose: bool) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            VERBOSE_ENV_CONFIG.to_string()
        } else {
            DEFAULT_ENV_CONFIG.to_string()
        }
    })
}

/// Configure logging
///
/// Logs go to stderr so that command output on stdout stays parseable.
///
/// # Errors
/// If the filter is invalid or a global subscriber is already installed
pub fn configure_logging(verbose: bool) -> Result<()> {
    let directives = filter_directives(verbose);
    let filter = EnvFilter::from_str(&directives)
        .map_err(|e| Error::Logging(format!("wrong filter '{}': {}", directives, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
