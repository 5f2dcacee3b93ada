//! Review Deduplication
//!
//! Collapses the review history of a pull request into one decision per reviewer

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the author of a review or of a review request
///
/// Deleted or anonymous accounts have no login; they are represented by
/// [`ReviewerIdentity::Unknown`], which never matches any other identity,
/// including another `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReviewerIdentity {
    /// A user with a non-empty login
    User(String),

    /// A reviewer whose account no longer exists
    Unknown,
}

impl ReviewerIdentity {
    /// Build an identity from an optional login
    ///
    /// Missing and blank logins both yield [`ReviewerIdentity::Unknown`].
    pub fn from_login(login: Option<&str>) -> Self {
        match login.map(str::trim) {
            Some(login) if !login.is_empty() => ReviewerIdentity::User(login.to_string()),
            _ => ReviewerIdentity::Unknown,
        }
    }

    /// Login of the reviewer, if known
    pub fn login(&self) -> Option<&str> {
        match self {
            ReviewerIdentity::User(login) => Some(login),
            ReviewerIdentity::Unknown => None,
        }
    }

    /// Whether this identity designates the user `login`
    pub fn is_user(&self, login: &str) -> bool {
        self.login() == Some(login)
    }
}

impl fmt::Display for ReviewerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewerIdentity::User(login) => f.write_str(login),
            ReviewerIdentity::Unknown => f.write_str("(unknown)"),
        }
    }
}

/// Outcome of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    ChangesRequested,
    Commented,
    Other,
}

impl Verdict {
    /// Parse a review state as reported by GitHub
    ///
    /// Only the exact `CHANGES_REQUESTED` spelling is recognized; any other
    /// unknown state (`DISMISSED`, `PENDING`, typos) becomes [`Verdict::Other`].
    pub fn from_state(state: &str) -> Self {
        let state = state.trim();
        if state.eq_ignore_ascii_case("APPROVED") {
            Verdict::Approved
        } else if state.eq_ignore_ascii_case("CHANGES_REQUESTED") {
            Verdict::ChangesRequested
        } else if state.eq_ignore_ascii_case("COMMENTED") {
            Verdict::Commented
        } else {
            Verdict::Other
        }
    }

    /// Whether this verdict takes part in status classification
    pub fn is_decisive(self) -> bool {
        matches!(self, Verdict::Approved | Verdict::ChangesRequested)
    }
}

/// A single submitted review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Author of the review
    pub reviewer: ReviewerIdentity,

    /// Review outcome
    pub verdict: Verdict,

    /// Submission order, higher is more recent
    pub sequence: u64,
}

impl ReviewEvent {
    pub fn new(reviewer: ReviewerIdentity, verdict: Verdict, sequence: u64) -> Self {
        Self {
            reviewer,
            verdict,
            sequence,
        }
    }
}

/// Keep the most recent review of each reviewer
///
/// Reviews from [`ReviewerIdentity::Unknown`] authors can never be matched
/// against another review; they are kept as-is when their verdict is
/// decisive and dropped otherwise.
///
/// The result is ordered by `sequence`, then by reviewer.
pub fn dedupe(events: &[ReviewEvent]) -> Vec<ReviewEvent> {
    let mut latest: HashMap<&str, &ReviewEvent> = HashMap::new();
    let mut anonymous = Vec::new();

    for event in events {
        match &event.reviewer {
            ReviewerIdentity::User(login) => match latest.get(login.as_str()) {
                Some(existing) if existing.sequence > event.sequence => {}
                _ => {
                    latest.insert(login.as_str(), event);
                }
            },
            ReviewerIdentity::Unknown => {
                if event.verdict.is_decisive() {
                    anonymous.push(event);
                }
            }
        }
    }

    let mut deduped: Vec<ReviewEvent> = latest
        .into_values()
        .chain(anonymous)
        .cloned()
        .collect();
    deduped.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then_with(|| a.reviewer.cmp(&b.reviewer))
    });
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn review(login: &str, verdict: Verdict, sequence: u64) -> ReviewEvent {
        ReviewEvent::new(ReviewerIdentity::from_login(Some(login)), verdict, sequence)
    }

    fn anonymous(verdict: Verdict, sequence: u64) -> ReviewEvent {
        ReviewEvent::new(ReviewerIdentity::Unknown, verdict, sequence)
    }

    #[test]
    fn test_identity_from_login() {
        assert_eq!(
            ReviewerIdentity::from_login(Some("alice")),
            ReviewerIdentity::User("alice".to_string())
        );
        assert_eq!(ReviewerIdentity::from_login(None), ReviewerIdentity::Unknown);
        assert_eq!(ReviewerIdentity::from_login(Some("")), ReviewerIdentity::Unknown);
        assert_eq!(
            ReviewerIdentity::from_login(Some("  ")),
            ReviewerIdentity::Unknown
        );
    }

    #[test]
    fn test_unknown_identity_matches_nothing() {
        assert!(!ReviewerIdentity::Unknown.is_user(""));
        assert!(!ReviewerIdentity::Unknown.is_user("(unknown)"));
        assert!(ReviewerIdentity::User("bob".to_string()).is_user("bob"));
    }

    #[test]
    fn test_verdict_parsing() {
        assert_eq!(Verdict::from_state("APPROVED"), Verdict::Approved);
        assert_eq!(
            Verdict::from_state("CHANGES_REQUESTED"),
            Verdict::ChangesRequested
        );
        assert_eq!(Verdict::from_state("changes_requested"), Verdict::ChangesRequested);
        assert_eq!(Verdict::from_state("COMMENTED"), Verdict::Commented);
        assert_eq!(Verdict::from_state("DISMISSED"), Verdict::Other);

        // Historical misspelling is not a changes-requested verdict
        assert_eq!(Verdict::from_state("CHANGE_REQUESTED"), Verdict::Other);
    }

    #[test]
    fn test_latest_review_wins() {
        let events = vec![
            review("bob", Verdict::ChangesRequested, 1),
            review("carol", Verdict::Approved, 2),
            review("bob", Verdict::Approved, 3),
        ];

        let deduped = dedupe(&events);
        assert_eq!(
            deduped,
            vec![
                review("carol", Verdict::Approved, 2),
                review("bob", Verdict::Approved, 3),
            ]
        );
    }

    #[test]
    fn test_latest_review_wins_regardless_of_input_order() {
        let events = vec![
            review("bob", Verdict::Approved, 7),
            review("bob", Verdict::ChangesRequested, 2),
        ];

        assert_eq!(dedupe(&events), vec![review("bob", Verdict::Approved, 7)]);
    }

    #[test]
    fn test_comment_after_approval_replaces_it() {
        // A later comment is still the reviewer's latest submission
        let events = vec![
            review("carol", Verdict::Approved, 1),
            review("carol", Verdict::Commented, 2),
        ];

        assert_eq!(dedupe(&events), vec![review("carol", Verdict::Commented, 2)]);
    }

    #[test]
    fn test_unknown_reviewers_are_never_merged() {
        let events = vec![
            anonymous(Verdict::ChangesRequested, 1),
            anonymous(Verdict::Approved, 2),
            anonymous(Verdict::Commented, 3),
            review("alice", Verdict::Approved, 4),
        ];

        let deduped = dedupe(&events);
        assert_eq!(
            deduped,
            vec![
                anonymous(Verdict::ChangesRequested, 1),
                anonymous(Verdict::Approved, 2),
                review("alice", Verdict::Approved, 4),
            ]
        );
    }

    #[test]
    fn test_unknown_reviewers_do_not_retain_user_duplicates() {
        let events = vec![
            review("alice", Verdict::ChangesRequested, 1),
            anonymous(Verdict::Approved, 2),
            review("alice", Verdict::Approved, 3),
        ];

        let deduped = dedupe(&events);
        let alice: Vec<_> = deduped
            .iter()
            .filter(|event| event.reviewer.is_user("alice"))
            .collect();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].verdict, Verdict::Approved);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(&[]).is_empty());
    }

    #[test]
    fn test_dedupe_is_deterministic() {
        let events = vec![
            review("dave", Verdict::Approved, 1),
            review("erin", Verdict::Approved, 1),
            review("frank", Verdict::ChangesRequested, 1),
        ];

        let first = dedupe(&events);
        for _ in 0..10 {
            assert_eq!(dedupe(&events), first);
        }
        assert_eq!(first.len(), 3);
    }
}
