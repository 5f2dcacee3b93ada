//! GitHub API Client
//!
//! Module for managing interactions with the GitHub API

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mapping::StatusLabel;
use crate::review::{ReviewEvent, ReviewerIdentity, Verdict};
use crate::status::{MergeableState, PullRequestSnapshot, ReviewerRequest};

/// Color used when creating a label that has none configured
const FALLBACK_LABEL_COLOR: &str = "ededed";

/// HTTP status of an error reported by the GitHub API
fn github_status(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Check if an octocrab error is a 404 Not Found
fn is_not_found_error(err: &octocrab::Error) -> bool {
    github_status(err) == Some(404)
}

/// Check if an octocrab error reports a label that already exists
///
/// GitHub answers 422 with an `already_exists` validation error.
fn is_already_exists_error(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 422 => source
            .errors
            .as_ref()
            .is_some_and(|errors| {
                errors
                    .iter()
                    .any(|error| error.get("code").and_then(|code| code.as_str()) == Some("already_exists"))
            }),
        _ => false,
    }
}

/// Map a 404 on a pull request sub-resource to a missing pull request
fn pull_request_error(number: u64) -> impl Fn(octocrab::Error) -> Error {
    move |e| {
        if is_not_found_error(&e) {
            Error::PullRequestNotFound(number)
        } else {
            Error::GitHubApi(e)
        }
    }
}

/// Remote collaborator used by the triage run
///
/// Every call is scoped to the repository the implementation was built for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Fetch the triage-relevant state of a pull request
    ///
    /// # Errors
    /// Returns [`Error::PullRequestNotFound`] if the pull request does not exist
    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot>;

    /// Fetch the review history of a pull request, in submission order
    async fn fetch_reviews(&self, number: u64) -> Result<Vec<ReviewEvent>>;

    /// Fetch the pending review requests of a pull request
    async fn fetch_requested_reviewers(&self, number: u64) -> Result<BTreeSet<ReviewerRequest>>;

    /// List the names of all labels defined in the repository
    async fn list_repository_labels(&self) -> Result<Vec<String>>;

    /// Create a repository label
    ///
    /// # Errors
    /// Returns [`Error::LabelAlreadyExists`] if a label with this name exists
    async fn create_label(&self, label: &StatusLabel) -> Result<()>;

    /// Add labels to a pull request
    async fn add_labels(&self, number: u64, names: &[String]) -> Result<()>;

    /// Remove a label from a pull request
    ///
    /// # Errors
    /// Returns [`Error::LabelNotFound`] if the label is not on the pull request
    async fn remove_label(&self, number: u64, name: &str) -> Result<()>;
}

/// Label as returned by the GitHub API
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitHubLabel {
    /// Label name
    pub name: String,

    /// Label color (6-digit hexadecimal, without #)
    #[serde(default)]
    pub color: Option<String>,

    /// Label description
    #[serde(default)]
    pub description: Option<String>,
}

/// Pull request as returned by the GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
}

impl From<GitHubPullRequest> for PullRequestSnapshot {
    fn from(pull: GitHubPullRequest) -> Self {
        PullRequestSnapshot {
            number: pull.number,
            is_open: pull.state.eq_ignore_ascii_case("open"),
            is_draft: pull.draft.unwrap_or(false),
            mergeable_state: pull
                .mergeable_state
                .as_deref()
                .map(MergeableState::parse)
                .unwrap_or_default(),
            current_labels: pull.labels.into_iter().map(|label| label.name).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubTeam {
    pub slug: String,
}

/// Review as returned by the GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    #[serde(default)]
    pub user: Option<GitHubUser>,
    pub state: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Pending review requests as returned by the GitHub API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubRequestedReviewers {
    #[serde(default)]
    pub users: Vec<GitHubUser>,
    #[serde(default)]
    pub teams: Vec<GitHubTeam>,
}

impl From<GitHubRequestedReviewers> for BTreeSet<ReviewerRequest> {
    fn from(requested: GitHubRequestedReviewers) -> Self {
        let users = requested
            .users
            .into_iter()
            .map(|user| ReviewerRequest::User(user.login));
        let teams = requested
            .teams
            .into_iter()
            .map(|team| ReviewerRequest::Team(team.slug));
        users.chain(teams).collect()
    }
}

/// Convert fetched reviews to review events
///
/// Sequence numbers follow `submitted_at`; reviews without a submission date
/// come last, and ties keep the API order.
pub fn review_events(reviews: Vec<GitHubReview>) -> Vec<ReviewEvent> {
    let mut reviews = reviews;
    reviews.sort_by_key(|review| (review.submitted_at.is_none(), review.submitted_at));

    reviews
        .into_iter()
        .enumerate()
        .map(|(index, review)| {
            ReviewEvent::new(
                ReviewerIdentity::from_login(review.user.as_ref().map(|user| user.login.as_str())),
                Verdict::from_state(&review.state),
                index as u64,
            )
        })
        .collect()
}

/// GitHub API Client
///
/// Client responsible for interactions with the GitHub API
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    /// - `owner`: Repository owner
    /// - `repo`: Repository name
    ///
    /// # Errors
    /// Returns an error if the token is empty or client initialization fails
    pub fn new(access_token: &str, owner: &str, repo: &str) -> Result<Self> {
        Self::build(access_token, owner, repo, None)
    }

    /// Create a GitHub client talking to another API root (GitHub Enterprise)
    ///
    /// # Errors
    /// Returns an error if the token is empty, the URI is invalid or client
    /// initialization fails
    pub fn with_base_uri(access_token: &str, owner: &str, repo: &str, base_uri: &str) -> Result<Self> {
        Self::build(access_token, owner, repo, Some(base_uri))
    }

    fn build(access_token: &str, owner: &str, repo: &str, base_uri: Option<&str>) -> Result<Self> {
        if access_token.trim().is_empty() {
            return Err(Error::config_validation("Access token is required"));
        }

        let mut builder = Octocrab::builder().personal_token(access_token.to_string());
        if let Some(base_uri) = base_uri {
            builder = builder.base_uri(base_uri)?;
        }

        Ok(Self {
            octocrab: builder.build()?,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn pull_route(&self, number: u64) -> String {
        format!("/repos/{}/{}/pulls/{}", self.owner, self.repo, number)
    }
}

#[async_trait]
impl PullRequestService for GitHubClient {
    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot> {
        let pull: GitHubPullRequest = self
            .octocrab
            .get(self.pull_route(number), None::<&()>)
            .await
            .map_err(pull_request_error(number))?;

        debug!(
            number,
            state = %pull.state,
            draft = ?pull.draft,
            mergeable_state = ?pull.mergeable_state,
            "fetched pull request"
        );
        Ok(pull.into())
    }

    async fn fetch_reviews(&self, number: u64) -> Result<Vec<ReviewEvent>> {
        let reviews: Vec<GitHubReview> = self
            .octocrab
            .get(
                format!("{}/reviews", self.pull_route(number)),
                Some(&[("per_page", 100)]),
            )
            .await
            .map_err(pull_request_error(number))?;

        debug!(number, count = reviews.len(), "fetched reviews");
        Ok(review_events(reviews))
    }

    async fn fetch_requested_reviewers(&self, number: u64) -> Result<BTreeSet<ReviewerRequest>> {
        let requested: GitHubRequestedReviewers = self
            .octocrab
            .get(
                format!("{}/requested_reviewers", self.pull_route(number)),
                None::<&()>,
            )
            .await
            .map_err(pull_request_error(number))?;

        debug!(
            number,
            users = requested.users.len(),
            teams = requested.teams.len(),
            "fetched requested reviewers"
        );
        Ok(requested.into())
    }

    async fn list_repository_labels(&self) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .octocrab
                .issues(&self.owner, &self.repo)
                .list_labels_for_repo()
                .page(page)
                .per_page(100)
                .send()
                .await?;

            if response.items.is_empty() {
                break;
            }

            labels.extend(response.items.into_iter().map(|label| label.name));
            page += 1;
        }

        Ok(labels)
    }

    async fn create_label(&self, label: &StatusLabel) -> Result<()> {
        let color = label
            .api_color()
            .unwrap_or_else(|| FALLBACK_LABEL_COLOR.to_string());

        self.octocrab
            .issues(&self.owner, &self.repo)
            .create_label(
                &label.name,
                &color,
                label.description.as_deref().unwrap_or(""),
            )
            .await
            .map_err(|e| {
                if is_already_exists_error(&e) {
                    Error::LabelAlreadyExists(label.name.clone())
                } else {
                    Error::GitHubApi(e)
                }
            })?;

        Ok(())
    }

    async fn add_labels(&self, number: u64, names: &[String]) -> Result<()> {
        self.octocrab
            .issues(&self.owner, &self.repo)
            .add_labels(number, names)
            .await?;

        Ok(())
    }

    async fn remove_label(&self, number: u64, name: &str) -> Result<()> {
        // octocrab percent-encodes the name itself
        self.octocrab
            .issues(&self.owner, &self.repo)
            .remove_label(number, name)
            .await
            .map_err(|e| {
                if is_not_found_error(&e) {
                    Error::LabelNotFound(name.to_string())
                } else {
                    Error::GitHubApi(e)
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pull_request_conversion() {
        let payload = r##"{
            "number": 7,
            "state": "open",
            "draft": false,
            "mergeable_state": "dirty",
            "labels": [{"name": "bug", "color": "d73a4a", "description": null}]
        }"##;
        let pull: GitHubPullRequest = serde_json::from_str(payload).unwrap();
        let snapshot = PullRequestSnapshot::from(pull);

        assert_eq!(
            snapshot,
            PullRequestSnapshot {
                number: 7,
                is_open: true,
                is_draft: false,
                mergeable_state: MergeableState::Conflicting,
                current_labels: vec!["bug".to_string()],
            }
        );
    }

    #[test]
    fn test_pull_request_conversion_missing_fields() {
        let pull: GitHubPullRequest =
            serde_json::from_str(r#"{"number": 3, "state": "closed"}"#).unwrap();
        let snapshot = PullRequestSnapshot::from(pull);

        assert!(!snapshot.is_open);
        assert!(!snapshot.is_draft);
        assert_eq!(snapshot.mergeable_state, MergeableState::Unknown);
        assert!(snapshot.current_labels.is_empty());
    }

    #[test]
    fn test_requested_reviewers_conversion() {
        let payload = r#"{
            "users": [{"login": "alice"}],
            "teams": [{"slug": "core", "name": "Core"}]
        }"#;
        let requested: GitHubRequestedReviewers = serde_json::from_str(payload).unwrap();
        let requests = BTreeSet::from(requested);

        assert_eq!(
            requests,
            BTreeSet::from([
                ReviewerRequest::User("alice".to_string()),
                ReviewerRequest::Team("core".to_string()),
            ])
        );
    }

    #[test]
    fn test_review_events_sequence_follows_submission_date() {
        let payload = r#"[
            {"user": {"login": "bob"}, "state": "APPROVED", "submitted_at": "2024-03-02T10:00:00Z"},
            {"user": null, "state": "CHANGES_REQUESTED", "submitted_at": "2024-03-01T10:00:00Z"},
            {"user": {"login": "carol"}, "state": "PENDING"},
            {"user": {"login": "bob"}, "state": "COMMENTED", "submitted_at": "2024-03-03T10:00:00Z"}
        ]"#;
        let reviews: Vec<GitHubReview> = serde_json::from_str(payload).unwrap();

        assert_eq!(
            review_events(reviews),
            vec![
                ReviewEvent::new(ReviewerIdentity::Unknown, Verdict::ChangesRequested, 0),
                ReviewEvent::new(
                    ReviewerIdentity::User("bob".to_string()),
                    Verdict::Approved,
                    1
                ),
                ReviewEvent::new(
                    ReviewerIdentity::User("bob".to_string()),
                    Verdict::Commented,
                    2
                ),
                ReviewEvent::new(
                    ReviewerIdentity::User("carol".to_string()),
                    Verdict::Other,
                    3
                ),
            ]
        );
    }

    #[test]
    fn test_client_rejects_empty_token() {
        assert!(matches!(
            GitHubClient::new("  ", "owner", "repo"),
            Err(Error::ConfigValidation(_))
        ));
    }

    mod stub_server {
        use super::*;
        use pretty_assertions::assert_eq;
        use wiremock::matchers::{method, path, path_regex};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client(server: &MockServer) -> GitHubClient {
            GitHubClient::with_base_uri("token", "owner", "repo", &server.uri())
                .expect("client against stub server")
        }

        fn not_found() -> ResponseTemplate {
            ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            }))
        }

        #[tokio::test]
        async fn test_missing_pull_request_maps_to_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repos/owner/repo/pulls/404"))
                .respond_with(not_found())
                .mount(&server)
                .await;

            let result = client(&server).fetch_pull_request(404).await;
            assert!(matches!(result, Err(Error::PullRequestNotFound(404))));
        }

        #[tokio::test]
        async fn test_missing_pull_request_reviews_map_to_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path_regex(r"^/repos/owner/repo/pulls/9/(reviews|requested_reviewers)$"))
                .respond_with(not_found())
                .mount(&server)
                .await;

            let github = client(&server);
            assert!(matches!(
                github.fetch_reviews(9).await,
                Err(Error::PullRequestNotFound(9))
            ));
            assert!(matches!(
                github.fetch_requested_reviewers(9).await,
                Err(Error::PullRequestNotFound(9))
            ));
        }

        #[tokio::test]
        async fn test_server_error_stays_api_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repos/owner/repo/pulls/3"))
                .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                    "message": "Server Error"
                })))
                .mount(&server)
                .await;

            let result = client(&server).fetch_pull_request(3).await;
            assert!(matches!(result, Err(Error::GitHubApi(_))));
        }

        #[tokio::test]
        async fn test_existing_label_maps_to_already_exists() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/repos/owner/repo/labels"))
                .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                    "message": "Validation Failed",
                    "errors": [
                        { "resource": "Label", "code": "already_exists", "field": "name" }
                    ],
                    "documentation_url": "https://docs.github.com/rest"
                })))
                .mount(&server)
                .await;

            let label = StatusLabel::new("🚦status:to-merge", "#0e8a16").expect("valid label");
            let result = client(&server).create_label(&label).await;
            assert!(matches!(
                result,
                Err(Error::LabelAlreadyExists(name)) if name == "🚦status:to-merge"
            ));
        }

        #[tokio::test]
        async fn test_other_validation_failure_stays_api_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/repos/owner/repo/labels"))
                .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                    "message": "Validation Failed",
                    "errors": [
                        { "resource": "Label", "code": "invalid", "field": "color" }
                    ]
                })))
                .mount(&server)
                .await;

            let label = StatusLabel::named("status:odd");
            let result = client(&server).create_label(&label).await;
            assert!(matches!(result, Err(Error::GitHubApi(_))));
        }

        #[tokio::test]
        async fn test_removing_absent_label_maps_to_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path_regex(r"^/repos/owner/repo/issues/5/labels/.+$"))
                .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                    "message": "Label does not exist"
                })))
                .mount(&server)
                .await;

            let result = client(&server).remove_label(5, "status:gone").await;
            assert!(matches!(
                result,
                Err(Error::LabelNotFound(name)) if name == "status:gone"
            ));
        }

        #[tokio::test]
        async fn test_remove_label_encodes_name_once() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path_regex(r"^/repos/owner/repo/issues/5/labels/.+$"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
                .mount(&server)
                .await;

            client(&server)
                .remove_label(5, "🚦status:to-review")
                .await
                .expect("label removed");

            let requests = server.received_requests().await.expect("recorded requests");
            assert_eq!(requests.len(), 1);
            let url_path = requests[0].url.path().to_string();
            assert!(url_path.contains("%F0%9F%9A%A6"), "path was {}", url_path);
            assert!(!url_path.contains("%25"), "path was {}", url_path);
        }
    }
}
