//! Label Reconciliation
//!
//! Computes the label changes that bring a pull request to its desired labels

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::mapping::StatusLabel;

/// Labels to add to and remove from a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelPlan {
    /// Desired labels missing from the pull request
    pub to_add: Vec<StatusLabel>,

    /// Managed labels on the pull request that are no longer desired
    pub to_remove: Vec<StatusLabel>,
}

impl LabelPlan {
    /// Whether the plan requires no change
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Names of the labels to add
    pub fn names_to_add(&self) -> Vec<String> {
        self.to_add.iter().map(|label| label.name.clone()).collect()
    }

    /// Names of the labels to remove
    pub fn names_to_remove(&self) -> Vec<String> {
        self.to_remove.iter().map(|label| label.name.clone()).collect()
    }
}

/// Diff the current labels of a pull request against the desired ones
///
/// Only labels listed in `managed_names` are ever removed. Labels are
/// compared by name, duplicates are collapsed to their first occurrence,
/// and both outputs keep the order of their source.
pub fn reconcile(
    current: &[StatusLabel],
    desired: &[StatusLabel],
    managed_names: &BTreeSet<String>,
) -> LabelPlan {
    let current_names: HashSet<&str> = current.iter().map(|label| label.name.as_str()).collect();
    let desired_names: HashSet<&str> = desired.iter().map(|label| label.name.as_str()).collect();

    let mut seen = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|label| seen.insert(label.name.as_str()))
        .filter(|label| !current_names.contains(label.name.as_str()))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let to_remove = current
        .iter()
        .filter(|label| seen.insert(label.name.as_str()))
        .filter(|label| managed_names.contains(&label.name))
        .filter(|label| !desired_names.contains(label.name.as_str()))
        .cloned()
        .collect();

    LabelPlan { to_add, to_remove }
}
