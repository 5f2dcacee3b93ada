//! Configuration Management
//!
//! Run configuration and status label table loading

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mapping::{StatusLabel, StatusLabelMap};
use crate::status::StatusCode;

/// Convention-based label table file names searched in order
pub const CONVENTION_CONFIG_FILES: &[&str] = &[
    ".github/pr-triage.yml",
    ".github/pr-triage.yaml",
    ".github/pr-triage.json",
];

/// Triage Configuration
///
/// gh-pr-triage execution configuration
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// GitHub access token
    pub access_token: String,

    /// Target repository (owner/repo format)
    pub repository: String,

    /// Pull request to triage (skip the run if None)
    pub pull_request: Option<u64>,

    /// Dry-run mode (don't make actual changes)
    pub dry_run: bool,

    /// Status label table (use the default table if None)
    pub labels: Option<StatusLabelMap>,
}

impl TriageConfig {
    /// Validate configuration
    ///
    /// # Errors
    /// - If access token is empty
    /// - If repository format is invalid
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config_validation("Access token is required"));
        }

        parse_repository(&self.repository)?;

        Ok(())
    }

    /// Get repository owner and name
    pub fn parse_repository(&self) -> Result<(String, String)> {
        parse_repository(&self.repository)
    }

    /// Status label table in effect
    pub fn label_table(&self) -> StatusLabelMap {
        self.labels.clone().unwrap_or_default()
    }
}

/// Parse repository string into owner and name
///
/// # Arguments
/// - `repo`: Repository string in "owner/repo" format
///
/// # Errors
/// Returns an error if the format is invalid
pub fn parse_repository(repo: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = repo.split('/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(Error::InvalidRepositoryFormat(repo.to_string()));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

type RawLabelTable = BTreeMap<StatusCode, Option<StatusLabel>>;

/// Parse a label table from JSON
///
/// # Errors
/// If parsing fails or the table is invalid
pub fn parse_label_table_json(content: &str) -> Result<StatusLabelMap> {
    let raw: RawLabelTable = serde_json::from_str(content)?;
    StatusLabelMap::new(raw)
}

/// Parse a label table from YAML
///
/// # Errors
/// If parsing fails or the table is invalid
pub fn parse_label_table_yaml(content: &str) -> Result<StatusLabelMap> {
    let raw: RawLabelTable = serde_yaml::from_str(content)?;
    StatusLabelMap::new(raw)
}

/// Load a label table from a file, detecting format by extension
///
/// # Arguments
/// - `path`: Path to the table file (.json, .yaml, or .yml)
///
/// # Errors
/// If file reading, parsing, or validation fails, or if the extension is unsupported
pub fn load_label_table_from_file<P: AsRef<Path>>(path: P) -> Result<StatusLabelMap> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Configuration file not found: {}", path.display()),
        )
        .into());
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_label_table_json(&std::fs::read_to_string(path)?),
        Some("yaml") | Some("yml") => parse_label_table_yaml(&std::fs::read_to_string(path)?),
        _ => Err(Error::config_validation(
            "Configuration file must be .json, .yaml, or .yml",
        )),
    }
}

/// Search for a convention-based label table in the given directory
///
/// Searches for files in [`CONVENTION_CONFIG_FILES`] order and returns
/// the first one found.
pub fn find_convention_config_in(dir: &Path) -> Option<PathBuf> {
    CONVENTION_CONFIG_FILES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}

/// Resolve the label table of a run
///
/// An explicit path wins, then a convention file in `dir`, then the default table.
///
/// # Errors
/// If the selected file cannot be loaded
pub fn resolve_label_table(explicit: Option<&Path>, dir: &Path) -> Result<StatusLabelMap> {
    match explicit
        .map(Path::to_path_buf)
        .or_else(|| find_convention_config_in(dir))
    {
        Some(path) => load_label_table_from_file(path),
        None => Ok(StatusLabelMap::default()),
    }
}
