use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{self, ActivityMethod, ActivityQuery, OwnerType, SortOrder};
use crate::allow::{validate_repo, RepoRef};
use crate::config::Config;
use crate::error::ToolError;
use crate::format::{format_file_change, format_issue, format_pr, BLOCK_SEPARATOR};
use crate::http::{ApiError, GitHubClient};
use crate::models::{self, Created, FileChange, PullRequest, SearchIssues};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn descriptor(name: &str, description: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.into(),
        description: description.into(),
        input_schema,
    }
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        descriptor(
            "gh_search_issues",
            "Search issues in a repository (returns a readable list).",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string", "description": "owner/name"},
                    "q": {"type": "string", "description": "Free-text search terms"},
                    "state": {"type": "string", "enum": ["open", "closed", "all"], "default": "open"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 10}
                },
                "required": ["repo"]
            }),
        ),
        descriptor(
            "gh_open_issue",
            "Open an issue in a repository. labels_csv=comma-separated labels.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "title": {"type": "string"},
                    "body": {"type": "string", "default": ""},
                    "labels_csv": {"type": "string", "default": ""}
                },
                "required": ["repo", "title"]
            }),
        ),
        descriptor(
            "gh_comment_issue",
            "Add a comment to an existing issue or pull request.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "number": {"type": "integer", "minimum": 1},
                    "body": {"type": "string"}
                },
                "required": ["repo", "number", "body"]
            }),
        ),
        descriptor(
            "gh_list_prs",
            "List pull requests in a repository.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "state": {"type": "string", "enum": ["open", "closed", "all"], "default": "open"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 10}
                },
                "required": ["repo"]
            }),
        ),
        descriptor(
            "gh_get_pr_files",
            "Show changed files for a pull request.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "number": {"type": "integer", "minimum": 1},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 50}
                },
                "required": ["repo", "number"]
            }),
        ),
        descriptor(
            "gh_last_activity",
            "List repositories with their last code activity time, ranked by staleness or recency.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string", "description": "User or org login, or \"me\". Defaults to OWNER."},
                    "owner_type": {"type": "string", "enum": ["user", "org", "me"], "default": "user"},
                    "method": {"type": "string", "enum": ["pushed_at", "commit_api"], "default": "pushed_at"},
                    "include_forks": {"type": "boolean", "default": false},
                    "include_archived": {"type": "boolean", "default": false},
                    "max_repos": {"type": "integer", "minimum": 0, "default": 500},
                    "sort": {"type": "string", "enum": ["stale", "recent"], "default": "stale"}
                }
            }),
        ),
        descriptor(
            "gh_diag",
            "Diagnose GitHub auth, allow-list and the authenticated identity.",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
    ]
}

fn default_state() -> String {
    "open".to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_files_limit() -> u32 {
    50
}

fn default_max_repos() -> usize {
    500
}

#[derive(Debug, Deserialize)]
pub struct SearchIssuesInput {
    pub repo: String,
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct OpenIssueInput {
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels_csv: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentIssueInput {
    pub repo: String,
    pub number: u64,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ListPrsInput {
    pub repo: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct PrFilesInput {
    pub repo: String,
    pub number: u64,
    #[serde(default = "default_files_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct LastActivityInput {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_type: OwnerType,
    #[serde(default)]
    pub method: ActivityMethod,
    #[serde(default)]
    pub include_forks: bool,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default = "default_max_repos")]
    pub max_repos: usize,
    #[serde(default)]
    pub sort: SortOrder,
}

/// A parsed `tools/call` request.
#[derive(Debug)]
pub enum ToolCall {
    SearchIssues(SearchIssuesInput),
    OpenIssue(OpenIssueInput),
    CommentIssue(CommentIssueInput),
    ListPrs(ListPrsInput),
    PrFiles(PrFilesInput),
    LastActivity(LastActivityInput),
    Diag,
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidParams { tool: String, message: String },
}

fn args<T: DeserializeOwned>(tool: &str, v: Value) -> Result<T, CallError> {
    // Callers may omit arguments entirely.
    let v = if v.is_null() { Value::Object(Default::default()) } else { v };
    serde_json::from_value(v).map_err(|e| CallError::InvalidParams {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

impl ToolCall {
    pub fn parse(name: &str, arguments: Value) -> Result<Self, CallError> {
        Ok(match name {
            "gh_search_issues" => ToolCall::SearchIssues(args(name, arguments)?),
            "gh_open_issue" => ToolCall::OpenIssue(args(name, arguments)?),
            "gh_comment_issue" => ToolCall::CommentIssue(args(name, arguments)?),
            "gh_list_prs" => ToolCall::ListPrs(args(name, arguments)?),
            "gh_get_pr_files" => ToolCall::PrFiles(args(name, arguments)?),
            "gh_last_activity" => ToolCall::LastActivity(args(name, arguments)?),
            "gh_diag" => ToolCall::Diag,
            other => return Err(CallError::UnknownTool(other.to_string())),
        })
    }
}

fn enforce_limit(limit: u32) -> Result<u32, ToolError> {
    if limit == 0 {
        return Err(ToolError::InvalidArgument("limit must be at least 1".into()));
    }
    Ok(limit.min(100))
}

/// Tool operations over one shared GitHub client and configuration.
#[derive(Debug, Clone)]
pub struct Tools {
    client: GitHubClient,
}

impl Tools {
    pub fn new(cfg: Arc<Config>) -> Result<Self, ApiError> {
        Ok(Self {
            client: GitHubClient::new(cfg)?,
        })
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    fn repo(&self, repo: &str) -> Result<RepoRef, ToolError> {
        validate_repo(repo, &self.config().allowed)
    }

    /// Text-in, text-out entry point: failures are rendered as text.
    pub async fn invoke(&self, name: &str, arguments: Value) -> String {
        match ToolCall::parse(name, arguments) {
            Ok(call) => match self.run(call).await {
                Ok(text) => text,
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        }
    }

    pub async fn run(&self, call: ToolCall) -> Result<String, ToolError> {
        let res = match call {
            ToolCall::SearchIssues(i) => self.search_issues(i).await,
            ToolCall::OpenIssue(i) => self.open_issue(i).await,
            ToolCall::CommentIssue(i) => self.comment_issue(i).await,
            ToolCall::ListPrs(i) => self.list_prs(i).await,
            ToolCall::PrFiles(i) => self.pr_files(i).await,
            ToolCall::LastActivity(i) => self.last_activity(i).await,
            ToolCall::Diag => Ok(self.diag().await),
        };
        if let Err(e) = &res {
            debug!("tool call failed ({}): {}", e.kind(), e);
        }
        res
    }

    pub async fn search_issues(&self, input: SearchIssuesInput) -> Result<String, ToolError> {
        let repo = self.repo(&input.repo)?;
        let limit = enforce_limit(input.limit)?;
        let mut q = format!("repo:{} is:issue", repo);
        if input.state != "all" {
            q.push_str(&format!(" state:{}", input.state));
        }
        let terms = input.q.trim();
        if !terms.is_empty() {
            q.push(' ');
            q.push_str(terms);
        }
        let data = self
            .client
            .get("/search/issues", &[("q", q), ("per_page", limit.to_string())])
            .await?;
        let Some(mut found) = models::parse::<SearchIssues>(data) else {
            return Err(ToolError::empty("No results or request failed."));
        };
        found.items.truncate(limit as usize);
        if found.items.is_empty() {
            return Err(ToolError::empty("No matching issues."));
        }
        let now = Utc::now();
        Ok(found
            .items
            .iter()
            .map(|i| format_issue(i, now))
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR))
    }

    pub async fn open_issue(&self, input: OpenIssueInput) -> Result<String, ToolError> {
        let repo = self.repo(&input.repo)?;
        if input.title.trim().is_empty() {
            return Err(ToolError::InvalidArgument("title must not be empty".into()));
        }
        let labels: Vec<&str> = input
            .labels_csv
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let body = serde_json::json!({
            "title": input.title,
            "body": input.body,
            "labels": labels,
        });
        let created = self
            .client
            .post(&format!("/repos/{}/issues", repo), &body)
            .await?;
        match models::parse::<Created>(created) {
            Some(Created {
                number: Some(n),
                html_url: Some(url),
            }) => Ok(format!("Issue created: #{} {}", n, url)),
            _ => {
                warn!("issue creation in {} returned no html_url", repo);
                Err(ToolError::empty("Failed to create issue."))
            }
        }
    }

    pub async fn comment_issue(&self, input: CommentIssueInput) -> Result<String, ToolError> {
        let repo = self.repo(&input.repo)?;
        if input.body.trim().is_empty() {
            return Err(ToolError::InvalidArgument("body must not be empty".into()));
        }
        let res = self
            .client
            .post(
                &format!("/repos/{}/issues/{}/comments", repo, input.number),
                &serde_json::json!({ "body": input.body }),
            )
            .await?;
        match models::parse::<Created>(res).and_then(|c| c.html_url) {
            Some(url) => Ok(format!("Comment added: {}", url)),
            None => Err(ToolError::empty("Failed to add comment.")),
        }
    }

    pub async fn list_prs(&self, input: ListPrsInput) -> Result<String, ToolError> {
        let repo = self.repo(&input.repo)?;
        let limit = enforce_limit(input.limit)?;
        let data = self
            .client
            .get(
                &format!("/repos/{}/pulls", repo),
                &[("state", input.state.clone()), ("per_page", limit.to_string())],
            )
            .await?;
        let mut prs = models::parse_list::<PullRequest>(data).unwrap_or_default();
        prs.truncate(limit as usize);
        if prs.is_empty() {
            return Err(ToolError::empty("No PRs found."));
        }
        let now = Utc::now();
        Ok(prs
            .iter()
            .map(|pr| format_pr(pr, now))
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR))
    }

    pub async fn pr_files(&self, input: PrFilesInput) -> Result<String, ToolError> {
        let repo = self.repo(&input.repo)?;
        let limit = enforce_limit(input.limit)?;
        let data = self
            .client
            .get(
                &format!("/repos/{}/pulls/{}/files", repo, input.number),
                &[("per_page", limit.to_string())],
            )
            .await?;
        let mut files = models::parse_list::<FileChange>(data).unwrap_or_default();
        files.truncate(limit as usize);
        if files.is_empty() {
            return Err(ToolError::empty("No files found or request failed."));
        }
        Ok(files
            .iter()
            .map(format_file_change)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR))
    }

    pub async fn last_activity(&self, input: LastActivityInput) -> Result<String, ToolError> {
        let owner = input
            .owner
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .or_else(|| self.config().default_owner.clone())
            .ok_or_else(|| {
                ToolError::InvalidArgument("owner is required (pass owner or set OWNER)".into())
            })?;
        let query = ActivityQuery {
            owner,
            owner_type: input.owner_type,
            method: input.method,
            include_forks: input.include_forks,
            include_archived: input.include_archived,
            max_repos: input.max_repos,
            sort: input.sort,
        };
        activity::last_activity(&self.client, &self.config().allowed, &query, Utc::now()).await
    }

    /// Never fails: problems are reported inline.
    pub async fn diag(&self) -> String {
        let cfg = self.config();
        let login = match self.client.get("/user", &[]).await {
            Ok(v) => v
                .get("login")
                .and_then(|l| l.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            Err(e) => e.to_string(),
        };
        format!(
            "token_set={} | user_login={} | default_owner={} | allowed_patterns={}",
            cfg.token_set(),
            login,
            cfg.default_owner.as_deref().unwrap_or("(unset)"),
            cfg.allowed.describe()
        )
    }
}
