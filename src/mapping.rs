//! Status Label Mapping
//!
//! Maps triage statuses to the labels that represent them on a pull request

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::status::StatusCode;

/// Label Descriptor
///
/// Represents a label applied to a pull request. The name is the identity
/// of a label: two descriptors with the same name are the same label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusLabel {
    /// Label name
    pub name: String,

    /// Label color (6-digit hex code with # prefix required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Label description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StatusLabel {
    /// Create a label descriptor with a name only
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            color: None,
            description: None,
        }
    }

    /// Create a label descriptor with a name and a color
    ///
    /// # Errors
    /// Returns an error if the name is empty or the color format is invalid
    pub fn new<S: Into<String>>(name: S, color: S) -> Result<Self> {
        let label = Self {
            name: name.into(),
            color: Some(color.into()),
            description: None,
        };

        label.validate()?;
        Ok(label)
    }

    /// Validate label descriptor
    ///
    /// # Errors
    /// - If the name is empty
    /// - If the color format is invalid
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::label_validation("Label name cannot be empty"));
        }

        if let Some(color) = &self.color {
            if !color.starts_with('#') {
                return Err(Error::InvalidLabelColor(format!(
                    "Color must start with #: {}",
                    color
                )));
            }

            if !is_valid_hex_color(&Self::normalize_color(color)) {
                return Err(Error::InvalidLabelColor(color.clone()));
            }
        }

        Ok(())
    }

    /// Color as expected by the GitHub API (no #, lowercase)
    pub fn api_color(&self) -> Option<String> {
        self.color.as_deref().map(Self::normalize_color)
    }

    /// Normalize color (remove # and convert to lowercase)
    pub fn normalize_color(color: &str) -> String {
        color.trim_start_matches('#').to_lowercase()
    }
}

/// Status to label table
///
/// Statuses without an entry produce no label. Every label name in the table
/// is unique, and the set of names is the set of labels this tool manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusLabelMap {
    labels: BTreeMap<StatusCode, StatusLabel>,
}

impl StatusLabelMap {
    /// Build a table from its entries
    ///
    /// `None` entries leave the status unmapped.
    ///
    /// # Errors
    /// - If a label is invalid
    /// - If two statuses map to the same label name
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (StatusCode, Option<StatusLabel>)>,
    {
        let labels: BTreeMap<StatusCode, StatusLabel> = entries
            .into_iter()
            .filter_map(|(status, label)| label.map(|label| (status, label)))
            .collect();

        let mut seen = HashSet::new();
        for label in labels.values() {
            label.validate()?;
            if !seen.insert(label.name.as_str()) {
                return Err(Error::DuplicateLabelName(label.name.clone()));
            }
        }

        Ok(Self { labels })
    }

    /// Label mapped to a status, if any
    pub fn get(&self, status: StatusCode) -> Option<&StatusLabel> {
        self.labels.get(&status)
    }

    /// Labels of the given statuses, in status declaration order
    ///
    /// Unmapped statuses are skipped.
    pub fn to_labels(&self, statuses: &BTreeSet<StatusCode>) -> Vec<StatusLabel> {
        statuses
            .iter()
            .filter_map(|status| self.labels.get(status))
            .cloned()
            .collect()
    }

    /// Names of all labels owned by this table
    pub fn managed_names(&self) -> BTreeSet<String> {
        self.labels.values().map(|label| label.name.clone()).collect()
    }

    /// Iterate over mapped statuses and their labels
    pub fn iter(&self) -> impl Iterator<Item = (StatusCode, &StatusLabel)> {
        self.labels.iter().map(|(status, label)| (*status, label))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for StatusLabelMap {
    fn default() -> Self {
        let labels = default_status_labels()
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        Self { labels }
    }
}

/// Generate the default status label table
pub fn default_status_labels() -> Vec<(StatusCode, StatusLabel)> {
    vec![
        (
            StatusCode::NeedsReview,
            StatusLabel {
                name: "🚦status:to-review".to_string(),
                color: Some("#fbca04".to_string()),
                description: Some("Waiting for a review".to_string()),
            },
        ),
        (
            StatusCode::ChangesRequested,
            StatusLabel {
                name: "🚦status:to-change".to_string(),
                color: Some("#c2e0c6".to_string()),
                description: Some("A reviewer requested changes".to_string()),
            },
        ),
        (
            StatusCode::ReadyToMerge,
            StatusLabel {
                name: "🚦status:to-merge".to_string(),
                color: Some("#0e8a16".to_string()),
                description: Some("Approved and ready to merge".to_string()),
            },
        ),
        (
            StatusCode::NeedsRebase,
            StatusLabel {
                name: "🚦status:to-rebase".to_string(),
                color: Some("#fbca04".to_string()),
                description: Some("Conflicts with the base branch".to_string()),
            },
        ),
    ]
}

/// Validate hex color code
///
/// # Arguments
/// - `color`: Color code (6-digit hex without #)
fn is_valid_hex_color(color: &str) -> bool {
    if color.len() != 6 {
        return false;
    }

    color.chars().all(|c| c.is_ascii_hexdigit())
}
