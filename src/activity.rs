//! Cross-repository "last activity" report.
//!
//! Lists an owner's repositories (most recently pushed first), filters them,
//! resolves a last-activity timestamp per repository and ranks the result by
//! age. Repositories are inspected one at a time in listing order.

use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::allow::AllowList;
use crate::error::ToolError;
use crate::format::{format_repo_activity, iso_age_days, ACTIVITY_SEPARATOR};
use crate::http::{collect_all, encode_path_segment, GitHubClient};
use crate::models::{self, CommitEntry, RepoSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    #[default]
    User,
    Org,
    Me,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMethod {
    /// Use the listing's `pushed_at` field.
    #[default]
    PushedAt,
    /// Look up the newest commit on the default branch.
    CommitApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest activity first.
    #[default]
    Stale,
    /// Newest activity first.
    Recent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub owner: String,
    pub owner_type: OwnerType,
    pub method: ActivityMethod,
    pub include_forks: bool,
    pub include_archived: bool,
    pub max_repos: usize,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    PushedAt,
    CommitApi,
    CommitApiFailed,
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimestampSource::PushedAt => "pushed_at",
            TimestampSource::CommitApi => "commit_api",
            TimestampSource::CommitApiFailed => "pushed_at (commit_api_failed)",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub repo: String,
    pub private: bool,
    pub fork: bool,
    pub archived: bool,
    pub default_branch: String,
    pub last_activity: Option<String>,
    pub source: TimestampSource,
    pub html_url: String,
}

impl ActivityRecord {
    fn from_summary(r: &RepoSummary) -> Self {
        Self {
            repo: r.full_name.clone(),
            private: r.private,
            fork: r.fork,
            archived: r.archived,
            default_branch: r
                .default_branch
                .clone()
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| "main".to_string()),
            last_activity: r.pushed_at.clone(),
            source: TimestampSource::PushedAt,
            html_url: r.html_url.clone(),
        }
    }

    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.private {
            flags.push("private");
        }
        if self.fork {
            flags.push("fork");
        }
        if self.archived {
            flags.push("archived");
        }
        flags
    }
}

/// Listing endpoint and query for the requested owner. Only the literal owner
/// `me` selects the authenticated user's listing; `owner_type` picks between
/// the org and user endpoints for a named owner. All listings ask for
/// most-recently-pushed first.
pub fn listing_endpoint(
    owner: &str,
    owner_type: OwnerType,
) -> (String, Vec<(&'static str, String)>) {
    if owner == "me" {
        // `type` cannot be combined with `affiliation`/`visibility` on this endpoint.
        return (
            "/user/repos".to_string(),
            vec![
                ("visibility", "all".to_string()),
                (
                    "affiliation",
                    "owner,collaborator,organization_member".to_string(),
                ),
                ("sort", "pushed".to_string()),
            ],
        );
    }
    let params = vec![("type", "all".to_string()), ("sort", "pushed".to_string())];
    match owner_type {
        OwnerType::Org => (format!("/orgs/{}/repos", encode_path_segment(owner)), params),
        _ => (format!("/users/{}/repos", encode_path_segment(owner)), params),
    }
}

/// Replace the listing's `pushed_at` with the newest commit date on the default
/// branch. A failed call, an empty commit list (for example an empty
/// repository) and a commit without dates all keep `pushed_at` and are marked
/// `CommitApiFailed`.
async fn resolve_with_commit(client: &GitHubClient, rec: &mut ActivityRecord) {
    let path = format!("/repos/{}/commits", rec.repo);
    let query = [("sha", rec.default_branch.clone()), ("per_page", "1".to_string())];
    let newest = match client.get(&path, &query).await {
        Ok(v) => models::parse_list::<CommitEntry>(v).and_then(|mut c| {
            if c.is_empty() {
                None
            } else {
                Some(c.swap_remove(0))
            }
        }),
        Err(e) => {
            warn!("commit lookup for {} failed: {}", rec.repo, e);
            None
        }
    };
    match newest.as_ref().and_then(|c| c.activity_date()) {
        Some(date) => {
            rec.last_activity = Some(date.to_string());
            rec.source = TimestampSource::CommitApi;
        }
        None => {
            debug!("keeping pushed_at for {}", rec.repo);
            rec.source = TimestampSource::CommitApiFailed;
        }
    }
}

/// Filter the listing and resolve timestamps. Forks, archived repositories and
/// repositories outside the allow-list are skipped before counting toward
/// `max_repos`.
pub async fn collect_activity(
    client: &GitHubClient,
    allow: &AllowList,
    q: &ActivityQuery,
) -> Result<Vec<ActivityRecord>, ToolError> {
    if !client.config().token_set() {
        return Err(ToolError::MissingToken);
    }
    let (path, params) = listing_endpoint(&q.owner, q.owner_type);
    let listing: Vec<Value> = collect_all(client, &path, &params).await;
    if listing.is_empty() {
        return Err(ToolError::empty("No repositories found or request failed."));
    }
    info!("{} repositories listed from {}", listing.len(), path);

    let mut records = Vec::new();
    for raw in listing {
        if records.len() >= q.max_repos {
            break;
        }
        let Some(summary) = models::parse::<RepoSummary>(raw) else {
            warn!("skipping unparsable repository entry from {}", path);
            continue;
        };
        if summary.full_name.is_empty() {
            continue;
        }
        if (summary.fork && !q.include_forks) || (summary.archived && !q.include_archived) {
            continue;
        }
        if !allow.allows(&summary.full_name) {
            debug!("{} skipped by allow-list", summary.full_name);
            continue;
        }
        let mut rec = ActivityRecord::from_summary(&summary);
        if q.method == ActivityMethod::CommitApi {
            resolve_with_commit(client, &mut rec).await;
        }
        records.push(rec);
    }
    Ok(records)
}

/// Order records by age in whole days. `Stale` puts the oldest first, `Recent`
/// the newest first. Records without a parsable timestamp always come last and
/// equal ages keep their listing order.
pub fn rank(
    records: Vec<ActivityRecord>,
    sort: SortOrder,
    now: DateTime<Utc>,
) -> Vec<ActivityRecord> {
    let (mut dated, undated): (Vec<_>, Vec<_>) = records
        .into_iter()
        .map(|r| (iso_age_days(r.last_activity.as_deref(), now), r))
        .partition(|(age, _)| age.is_some());
    match sort {
        SortOrder::Stale => dated.sort_by_key(|(age, _)| Reverse(*age)),
        SortOrder::Recent => dated.sort_by_key(|(age, _)| *age),
    }
    dated.into_iter().chain(undated).map(|(_, r)| r).collect()
}

/// Full report: collect, rank and format.
pub async fn last_activity(
    client: &GitHubClient,
    allow: &AllowList,
    q: &ActivityQuery,
    now: DateTime<Utc>,
) -> Result<String, ToolError> {
    let records = collect_activity(client, allow, q).await?;
    if records.is_empty() {
        return Err(ToolError::empty("No repositories matched the filters."));
    }
    let ranked = rank(records, q.sort, now);
    Ok(ranked
        .iter()
        .map(|r| format_repo_activity(r, now))
        .collect::<Vec<_>>()
        .join(ACTIVITY_SEPARATOR))
}
