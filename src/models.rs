//! Read-only projections of GitHub REST records.
//!
//! Only the fields the formatters need are kept. Every field defaults when
//! missing and unknown fields are ignored, so a partially-shaped record still
//! parses.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Issue {
    pub number: i64,
    pub state: String,
    pub title: String,
    pub html_url: String,
    pub user: Option<User>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PullRequest {
    pub number: i64,
    pub state: String,
    pub title: String,
    pub html_url: String,
    pub user: Option<User>,
    pub head: GitRef,
    pub base: GitRef,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileChange {
    pub filename: String,
    pub status: String,
    pub additions: i64,
    pub deletions: i64,
    pub changes: i64,
    pub blob_url: String,
}

/// Repository listing entry used by the activity report.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepoSummary {
    pub full_name: String,
    pub private: bool,
    pub fork: bool,
    pub archived: bool,
    pub default_branch: Option<String>,
    pub pushed_at: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitActor {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitDetail {
    pub author: Option<GitActor>,
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitEntry {
    pub sha: String,
    pub commit: CommitDetail,
}

fn actor_date(actor: &Option<GitActor>) -> Option<&str> {
    actor
        .as_ref()
        .and_then(|a| a.date.as_deref())
        .filter(|d| !d.is_empty())
}

impl CommitEntry {
    /// Author date, or the committer date when the author has none.
    pub fn activity_date(&self) -> Option<&str> {
        actor_date(&self.commit.author).or_else(|| actor_date(&self.commit.committer))
    }
}

/// Response of `POST /repos/{repo}/issues` and `.../comments`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Created {
    pub number: Option<i64>,
    pub html_url: Option<String>,
}

/// Response of `GET /search/issues`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchIssues {
    pub items: Vec<Issue>,
}

/// Parse a JSON payload into a projection; `None` when the shape is wrong.
pub fn parse<T: DeserializeOwned>(v: Value) -> Option<T> {
    serde_json::from_value(v).ok()
}

/// Parse each element of a JSON array, dropping elements that do not fit.
pub fn parse_list<T: DeserializeOwned>(v: Value) -> Option<Vec<T>> {
    match v {
        Value::Array(items) => Some(items.into_iter().filter_map(parse).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pull_request_reads_nested_refs() {
        let pr: PullRequest = parse(json!({
            "number": 7, "title": "Fix", "state": "open",
            "html_url": "https://github.com/o/r/pull/7",
            "user": {"login": "alice", "id": 1},
            "head": {"ref": "feature", "sha": "abc"},
            "base": {"ref": "main"},
            "extra": {"ignored": true}
        }))
        .unwrap();
        assert_eq!(pr.head.ref_name, "feature");
        assert_eq!(pr.base.ref_name, "main");
        assert_eq!(pr.user.unwrap().login, "alice");
    }

    #[test]
    fn missing_fields_default() {
        let repo: RepoSummary = parse(json!({"full_name": "o/r"})).unwrap();
        assert!(!repo.fork);
        assert!(repo.pushed_at.is_none());
        assert!(repo.default_branch.is_none());
    }

    #[test]
    fn commit_date_prefers_author() {
        let c: CommitEntry = parse(json!({"sha": "1", "commit": {
            "author": {"date": "2024-01-01T00:00:00Z"},
            "committer": {"date": "2024-02-01T00:00:00Z"}
        }}))
        .unwrap();
        assert_eq!(c.activity_date(), Some("2024-01-01T00:00:00Z"));

        let c: CommitEntry = parse(json!({"sha": "1", "commit": {
            "author": null,
            "committer": {"date": "2024-02-01T00:00:00Z"}
        }}))
        .unwrap();
        assert_eq!(c.activity_date(), Some("2024-02-01T00:00:00Z"));

        let c: CommitEntry = parse(json!({"sha": "1"})).unwrap();
        assert_eq!(c.activity_date(), None);
    }

    #[test]
    fn parse_list_rejects_non_array() {
        assert!(parse_list::<Issue>(json!({"message": "x"})).is_none());
        assert_eq!(parse_list::<Issue>(json!([{"number": 1}, "junk"])).unwrap().len(), 1);
    }
}
