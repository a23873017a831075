use std::env;

use crate::allow::AllowList;

/// Process-wide configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub default_owner: Option<String>,
    pub allowed: AllowList,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            default_owner: None,
            allowed: AllowList::default(),
            api_url: "https://api.github.com".to_string(),
            api_version: "2022-11-28".to_string(),
            user_agent: default_user_agent(),
            timeout_secs: 30,
        }
    }
}

fn default_user_agent() -> String {
    format!("github-tools-mcp/{}", env!("CARGO_PKG_VERSION"))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN, GH_TOKEN or GITHUB_API_KEY (optional; tools report an auth error without it)
    /// - OWNER or GITHUB_OWNER (default owner for activity reports)
    /// - GH_ALLOWED_REPOS (comma-separated `owner/name`, `owner/*` or `*`)
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-tools-mcp/<version>)
    pub fn from_env() -> Result<Self, String> {
        let token = non_empty_var("GITHUB_TOKEN")
            .or_else(|| non_empty_var("GH_TOKEN"))
            .or_else(|| non_empty_var("GITHUB_API_KEY"));
        let default_owner = non_empty_var("OWNER").or_else(|| non_empty_var("GITHUB_OWNER"));
        let allowed = AllowList::parse(&env::var("GH_ALLOWED_REPOS").unwrap_or_default());

        let api_url = non_empty_var("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string());
        url::Url::parse(&api_url)
            .map_err(|e| format!("Invalid GITHUB_API_URL '{}': {}", api_url, e))?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let api_version =
            non_empty_var("GITHUB_API_VERSION").unwrap_or_else(|| "2022-11-28".to_string());
        let timeout_secs = non_empty_var("GITHUB_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        let user_agent = non_empty_var("GITHUB_USER_AGENT").unwrap_or_else(default_user_agent);

        Ok(Self {
            token,
            default_owner,
            allowed,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
        })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, owner: Option<String>, allowed_repos: Option<String>) -> Self {
        if let Some(owner) = owner.filter(|o| !o.trim().is_empty()) {
            self.default_owner = Some(owner.trim().to_string());
        }
        if let Some(raw) = allowed_repos {
            self.allowed = AllowList::parse(&raw);
        }
        self
    }

    pub fn token_set(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_env_values() {
        let cfg = Config {
            default_owner: Some("env-owner".into()),
            allowed: AllowList::parse("a/*"),
            ..Config::default()
        }
        .with_overrides(Some(" cli-owner ".into()), Some("b/c".into()));
        assert_eq!(cfg.default_owner.as_deref(), Some("cli-owner"));
        assert!(cfg.allowed.allows("b/c"));
        assert!(!cfg.allowed.allows("a/x"));
    }

    #[test]
    fn blank_owner_override_is_ignored() {
        let cfg = Config {
            default_owner: Some("env-owner".into()),
            ..Config::default()
        }
        .with_overrides(Some("  ".into()), None);
        assert_eq!(cfg.default_owner.as_deref(), Some("env-owner"));
        assert!(cfg.allowed.is_unrestricted());
    }
}
