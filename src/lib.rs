//! # gh-pr-triage
//!
//! Pull request triage labels computed from review and merge state
//!
//! ## Features
//! - Latest-review-wins deduplication per reviewer
//! - Independent review and merge status axes
//! - Configurable status to label table
//! - Minimal label changes that never touch unmanaged labels
//! - Dry-run mode

pub mod config;
pub mod context;
pub mod error;
pub mod github;
pub mod logging;
pub mod mapping;
pub mod reconcile;
pub mod review;
pub mod status;
pub mod sync;

pub use config::TriageConfig;
pub use error::{Error, Result};
pub use github::{GitHubClient, PullRequestService};
pub use mapping::{StatusLabel, StatusLabelMap};
pub use reconcile::{reconcile, LabelPlan};
pub use review::{dedupe, ReviewEvent, ReviewerIdentity, Verdict};
pub use status::{classify, MergeableState, PullRequestSnapshot, ReviewerRequest, StatusCode};
pub use sync::{TriageOutcome, TriageSyncer};

/// Triage one pull request with the default GitHub client
///
/// # Examples
///
/// ```rust,no_run
/// use gh_pr_triage::TriageConfig;
///
/// #[tokio::main]
/// async fn main() -> gh_pr_triage::Result<()> {
///     let config = TriageConfig {
///         access_token: "your_github_token".to_string(),
///         repository: "owner/repo".to_string(),
///         pull_request: Some(42),
///         dry_run: false,
///         labels: None,
///     };
///
///     let outcome = gh_pr_triage::triage_pull_request(&config).await?;
///     println!("Triage completed: {:?}", outcome);
///     Ok(())
/// }
/// ```
pub async fn triage_pull_request(config: &TriageConfig) -> Result<TriageOutcome> {
    let syncer = TriageSyncer::from_config(config)?;
    syncer.triage(config.pull_request).await
}
