//! Status Classification
//!
//! Derives the triage statuses of a pull request from its review and merge state

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::review::{ReviewEvent, Verdict};

/// Mergeability of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    Mergeable,
    Conflicting,
    Blocked,
    Behind,
    Unstable,
    #[default]
    Unknown,
}

impl MergeableState {
    /// Parse a mergeable state as reported by GitHub
    ///
    /// Accepts both the REST spelling (`clean`, `dirty`, ...) and the
    /// GraphQL one (`MERGEABLE`, `CONFLICTING`, `UNKNOWN`).
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "clean" | "has_hooks" | "mergeable" => MergeableState::Mergeable,
            "dirty" | "conflicting" => MergeableState::Conflicting,
            "blocked" => MergeableState::Blocked,
            "behind" => MergeableState::Behind,
            "unstable" => MergeableState::Unstable,
            _ => MergeableState::Unknown,
        }
    }
}

/// Pull request state relevant to triage, fetched once per run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullRequestSnapshot {
    /// Pull request number
    pub number: u64,

    /// Whether the pull request is open
    pub is_open: bool,

    /// Whether the pull request is a draft
    pub is_draft: bool,

    /// Mergeability
    pub mergeable_state: MergeableState,

    /// Names of the labels currently on the pull request
    pub current_labels: Vec<String>,
}

/// A pending review request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRequest {
    /// Request addressed to a user login
    User(String),

    /// Request addressed to a team slug
    Team(String),
}

/// Triage status of a pull request
///
/// Declaration order is the order labels are reported and applied in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    NeedsReview,
    ChangesRequested,
    ReadyToMerge,
    NeedsRebase,
}

impl StatusCode {
    /// All status codes, in declaration order
    pub const ALL: [StatusCode; 4] = [
        StatusCode::NeedsReview,
        StatusCode::ChangesRequested,
        StatusCode::ReadyToMerge,
        StatusCode::NeedsRebase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::NeedsReview => "needs_review",
            StatusCode::ChangesRequested => "changes_requested",
            StatusCode::ReadyToMerge => "ready_to_merge",
            StatusCode::NeedsRebase => "needs_rebase",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the triage statuses of a pull request
///
/// `reviews` must already be deduplicated (see [`crate::review::dedupe`]).
/// The review axis and the merge axis are evaluated independently, so the
/// result holds at most one status from each.
pub fn classify(
    snapshot: &PullRequestSnapshot,
    reviews: &[ReviewEvent],
    requests: &BTreeSet<ReviewerRequest>,
) -> BTreeSet<StatusCode> {
    let mut statuses = BTreeSet::new();

    if let Some(status) = review_status(snapshot, reviews, requests) {
        statuses.insert(status);
    }

    if let Some(status) = merge_status(snapshot.mergeable_state) {
        statuses.insert(status);
    }

    statuses
}

/// Review axis: first matching rule wins
fn review_status(
    snapshot: &PullRequestSnapshot,
    reviews: &[ReviewEvent],
    requests: &BTreeSet<ReviewerRequest>,
) -> Option<StatusCode> {
    if !snapshot.is_open || snapshot.is_draft {
        return None;
    }

    // A reviewer re-requested after asking for changes puts the PR back in review
    let blocking_changes = reviews.iter().any(|review| {
        review.verdict == Verdict::ChangesRequested
            && !review
                .reviewer
                .login()
                .is_some_and(|login| requests.contains(&ReviewerRequest::User(login.to_string())))
    });
    if blocking_changes {
        return Some(StatusCode::ChangesRequested);
    }

    if !requests.is_empty() {
        return Some(StatusCode::NeedsReview);
    }

    if reviews
        .iter()
        .any(|review| review.verdict == Verdict::Approved)
    {
        return Some(StatusCode::ReadyToMerge);
    }

    None
}

/// Merge axis
fn merge_status(state: MergeableState) -> Option<StatusCode> {
    match state {
        MergeableState::Conflicting => Some(StatusCode::NeedsRebase),
        _ => None,
    }
}
