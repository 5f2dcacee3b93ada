//! Pull Request Triage
//!
//! Module wiring review deduplication, status classification and label
//! reconciliation to the GitHub API

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::TriageConfig;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, PullRequestService};
use crate::mapping::{StatusLabel, StatusLabelMap};
use crate::reconcile::{reconcile, LabelPlan};
use crate::review::dedupe;
use crate::status::{classify, StatusCode};

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The run was not triggered for a pull request
    NoPullRequest,

    /// The pull request does not exist
    PullRequestNotFound(u64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPullRequest => f.write_str("no pull request in the event context"),
            SkipReason::PullRequestNotFound(number) => {
                write!(f, "pull request #{} not found", number)
            }
        }
    }
}

/// Outcome of a triage run
#[derive(Debug, Clone)]
pub enum TriageOutcome {
    /// Nothing to do
    Skipped(SkipReason),

    /// The pull request was classified and its labels reconciled
    Synced(TriageResult),
}

/// Triage result
#[derive(Debug, Clone)]
pub struct TriageResult {
    /// Pull request number
    pub pull_request: u64,

    /// Computed statuses
    pub statuses: BTreeSet<StatusCode>,

    /// Planned label changes
    pub plan: LabelPlan,

    /// Repository labels created
    pub created: Vec<String>,

    /// Labels added to the pull request
    pub added: Vec<String>,

    /// Labels removed from the pull request
    pub removed: Vec<String>,

    /// Whether this is a dry run
    pub dry_run: bool,

    /// Operations that encountered errors
    pub errors: Vec<String>,
}

impl TriageResult {
    /// Create a result with nothing applied yet
    pub fn new(
        pull_request: u64,
        statuses: BTreeSet<StatusCode>,
        plan: LabelPlan,
        dry_run: bool,
    ) -> Self {
        Self {
            pull_request,
            statuses,
            plan,
            created: Vec::new(),
            added: Vec::new(),
            removed: Vec::new(),
            dry_run,
            errors: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Whether label changes were planned
    pub fn has_changes(&self) -> bool {
        !self.plan.is_empty()
    }

    /// Whether every operation succeeded
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Pull Request Triage Engine
///
/// Classifies a pull request and brings its status labels up to date
pub struct TriageSyncer<S> {
    service: S,
    labels: StatusLabelMap,
    dry_run: bool,
}

impl TriageSyncer<GitHubClient> {
    /// Create a triage engine talking to GitHub
    ///
    /// # Errors
    /// Returns an error if configuration validation or GitHub client creation fails
    pub fn from_config(config: &TriageConfig) -> Result<Self> {
        config.validate()?;

        let (owner, repo) = config.parse_repository()?;
        let client = GitHubClient::new(&config.access_token, &owner, &repo)?;

        Ok(Self::new(client, config.label_table(), config.dry_run))
    }
}

impl<S: PullRequestService> TriageSyncer<S> {
    /// Create a triage engine over any pull request service
    pub fn new(service: S, labels: StatusLabelMap, dry_run: bool) -> Self {
        Self {
            service,
            labels,
            dry_run,
        }
    }

    /// Triage a pull request
    ///
    /// A missing or unknown pull request skips the run. Label write failures
    /// are collected in the result instead of aborting the run.
    ///
    /// # Errors
    /// Returns an error if the pull request state cannot be fetched
    pub async fn triage(&self, pull_request: Option<u64>) -> Result<TriageOutcome> {
        let Some(number) = pull_request else {
            info!("No pull request in the event context, skipping");
            return Ok(TriageOutcome::Skipped(SkipReason::NoPullRequest));
        };

        info!(number, "Fetching pull request, reviews and requested reviewers");
        // All three settle before any error is looked at, so a missing pull
        // request is never masked by whichever sibling fetch failed first.
        let (snapshot, reviews, requests) = futures::join!(
            self.service.fetch_pull_request(number),
            self.service.fetch_reviews(number),
            self.service.fetch_requested_reviewers(number),
        );
        let fetched = snapshot.and_then(|snapshot| Ok((snapshot, reviews?, requests?)));
        let (snapshot, reviews, requests) = match fetched {
            Ok(fetched) => fetched,
            Err(Error::PullRequestNotFound(number)) => {
                warn!(number, "Pull request not found, skipping");
                return Ok(TriageOutcome::Skipped(SkipReason::PullRequestNotFound(
                    number,
                )));
            }
            Err(e) => return Err(e),
        };

        let reviews = dedupe(&reviews);
        let statuses = classify(&snapshot, &reviews, &requests);
        info!("Computed statuses: {}", join_statuses(&statuses));

        let desired = self.labels.to_labels(&statuses);
        let current: Vec<StatusLabel> = snapshot
            .current_labels
            .iter()
            .map(StatusLabel::named)
            .collect();
        info!(
            "Current labels: {}",
            join_or_none(snapshot.current_labels.iter().map(String::as_str))
        );

        let plan = reconcile(&current, &desired, &self.labels.managed_names());
        let mut result = TriageResult::new(number, statuses, plan, self.dry_run);

        if !self.dry_run {
            self.apply_plan(number, &mut result).await;
        }

        Ok(TriageOutcome::Synced(result))
    }

    /// Apply the planned label changes, recording failures in `result`
    async fn apply_plan(&self, number: u64, result: &mut TriageResult) {
        let plan = result.plan.clone();

        if !plan.to_add.is_empty() {
            let names = plan.names_to_add();
            info!("Adding labels: {}", names.join(","));

            self.ensure_labels_exist(&plan.to_add, result).await;

            match self.service.add_labels(number, &names).await {
                Ok(()) => result.added.extend(names),
                Err(e) => result.add_error(format!("Failed to add labels {:?}: {}", names, e)),
            }
        }

        if !plan.to_remove.is_empty() {
            let names = plan.names_to_remove();
            info!("Removing labels: {}", names.join(","));

            let removals = join_all(
                names
                    .iter()
                    .map(|name| self.service.remove_label(number, name)),
            )
            .await;

            for (name, removal) in names.into_iter().zip(removals) {
                match removal {
                    Ok(()) => result.removed.push(name),
                    Err(Error::LabelNotFound(_)) => {
                        warn!(label = %name, "Label was already removed");
                    }
                    Err(e) => {
                        result.add_error(format!("Failed to remove label '{}': {}", name, e))
                    }
                }
            }
        }
    }

    /// Create the repository labels missing among `labels`
    async fn ensure_labels_exist(&self, labels: &[StatusLabel], result: &mut TriageResult) {
        let existing: HashSet<String> = match self.service.list_repository_labels().await {
            Ok(existing) => existing.into_iter().collect(),
            Err(e) => {
                result.add_error(format!("Failed to list repository labels: {}", e));
                return;
            }
        };

        for label in labels.iter().filter(|label| !existing.contains(&label.name)) {
            match self.service.create_label(label).await {
                Ok(()) => {
                    info!(label = %label.name, "Created label");
                    result.created.push(label.name.clone());
                }
                Err(Error::LabelAlreadyExists(_)) => {
                    warn!(label = %label.name, "Label was created concurrently");
                }
                Err(e) => result.add_error(format!(
                    "Failed to create label '{}': {}",
                    label.name, e
                )),
            }
        }
    }
}

fn join_statuses(statuses: &BTreeSet<StatusCode>) -> String {
    join_or_none(statuses.iter().map(|status| status.as_str()))
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}
