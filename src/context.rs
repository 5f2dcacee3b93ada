//! Event Context
//!
//! Discovers the repository and pull request a run was triggered for

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable holding the `owner/repo` of the workflow
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Environment variable holding the path of the triggering event payload
pub const EVENT_PATH_ENV: &str = "GITHUB_EVENT_PATH";

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    pull_request: Option<PullRequestRef>,
    #[serde(default)]
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

/// Extract the pull request number from an event payload
///
/// `pull_request`, `pull_request_target` and `pull_request_review` events all
/// carry a `pull_request` object. A top-level `number` is used when that object
/// is absent. Other events yield `None`.
///
/// # Errors
/// If the payload is not valid JSON
pub fn pull_request_from_event(content: &str) -> Result<Option<u64>> {
    let payload: EventPayload = serde_json::from_str(content)
        .map_err(|e| Error::EventPayload(e.to_string()))?;

    Ok(payload
        .pull_request
        .map(|pull| pull.number)
        .or(payload.number))
}

/// Read the pull request number from an event payload file
///
/// # Errors
/// If the file cannot be read or parsed
pub fn pull_request_from_event_file<P: AsRef<Path>>(path: P) -> Result<Option<u64>> {
    let content = std::fs::read_to_string(path)?;
    pull_request_from_event(&content)
}

/// Pull request number of the current workflow run, if any
///
/// # Errors
/// If `GITHUB_EVENT_PATH` is set but its payload cannot be read
pub fn pull_request_from_env() -> Result<Option<u64>> {
    match std::env::var(EVENT_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => pull_request_from_event_file(path),
        _ => Ok(None),
    }
}

/// Repository of the current workflow run, if any
pub fn repository_from_env() -> Option<String> {
    std::env::var(REPOSITORY_ENV)
        .ok()
        .filter(|repository| !repository.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_event() {
        let payload = r#"{"action": "opened", "number": 12, "pull_request": {"number": 12, "draft": false}}"#;
        assert_eq!(pull_request_from_event(payload).unwrap(), Some(12));
    }

    #[test]
    fn test_review_event() {
        let payload = r#"{"action": "submitted", "review": {"state": "approved"}, "pull_request": {"number": 5}}"#;
        assert_eq!(pull_request_from_event(payload).unwrap(), Some(5));
    }

    #[test]
    fn test_top_level_number_without_pull_request_object() {
        let payload = r#"{"action": "opened", "number": 12}"#;
        assert_eq!(pull_request_from_event(payload).unwrap(), Some(12));
    }

    #[test]
    fn test_pull_request_object_takes_precedence() {
        let payload = r#"{"number": 3, "pull_request": {"number": 4}}"#;
        assert_eq!(pull_request_from_event(payload).unwrap(), Some(4));
    }

    #[test]
    fn test_non_pull_request_event() {
        let payload = r#"{"ref": "refs/heads/main", "commits": []}"#;
        assert_eq!(pull_request_from_event(payload).unwrap(), None);
    }

    #[test]
    fn test_invalid_payload() {
        assert!(matches!(
            pull_request_from_event("not json"),
            Err(Error::EventPayload(_))
        ));
    }

    #[test]
    fn test_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"pull_request": {"number": 99}}"#).unwrap();

        assert_eq!(pull_request_from_event_file(&path).unwrap(), Some(99));
        assert!(pull_request_from_event_file(dir.path().join("missing.json")).is_err());
    }
}
