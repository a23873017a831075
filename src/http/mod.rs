use crate::config::Config;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod pagination;

pub use pagination::{collect_all, PAGE_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i32>,
    pub used: Option<i32>,
    pub reset_at: Option<String>,
}

/// Failure of a single REST call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("GitHub API token is not set")]
    MissingToken,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request failed: {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Request failed: invalid JSON response: {0}")]
    Decode(String),
}

/// `Ok` carries the parsed JSON payload, `Err` a uniform failure.
pub type ApiResult = Result<Value, ApiError>;

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(&cfg.user_agent) {
        default_headers.insert(USER_AGENT, ua);
    }
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ApiError {
    let code = match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::UNPROCESSABLE_ENTITY => "unprocessable",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        s if s.is_server_error() => "upstream_error",
        _ => "server_error",
    };
    ApiError::Status {
        status: status.as_u16(),
        code: code.to_string(),
        message,
    }
}

/// GitHub error bodies are `{"message": "..."}`; fall back to the raw text.
fn error_message_from_body(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string())
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let used = headers
        .get("x-ratelimit-used")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
        .map(|dt| dt.to_rfc3339());
    RateMeta {
        remaining,
        used,
        reset_at,
    }
}

/// Percent-encode a single path segment (owner or org names from callers).
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Authenticated GitHub REST client shared by all tools.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    cfg: Arc<Config>,
}

impl GitHubClient {
    pub fn new(cfg: Arc<Config>) -> Result<Self, ApiError> {
        let http = build_client(&cfg).map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.cfg.api_url, path)
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ApiResult {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Perform one authenticated call. Never panics and never retries: any
    /// transport failure, non-2xx status or undecodable body becomes an `Err`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ApiResult {
        let Some(token) = self.cfg.token.as_deref() else {
            return Err(ApiError::MissingToken);
        };
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::Transport(format!("invalid token header: {}", e)))?;
        let url = self.url_for(path);
        debug!("REST {} {}", method, url);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, auth)
            .header("X-GitHub-Api-Version", &self.cfg.api_version)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github+json"),
            );
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let res = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("REST {} {} error sending request: {}", method, url, e);
                return Err(ApiError::Transport(e.to_string()));
            }
        };

        let status = res.status();
        let rate = extract_rate_from_rest(res.headers());
        debug!("REST {} {} -> {} rate={:?}", method, url, status, rate);
        if rate.remaining == Some(0) {
            warn!("GitHub rate limit exhausted; resets at {:?}", rate.reset_at);
        }

        let text = match res.text().await {
            Ok(t) => t,
            Err(e) => {
                warn!("REST {} {} error reading body: {}", method, url, e);
                return Err(ApiError::Transport(e.to_string()));
            }
        };

        if !status.is_success() {
            warn!("REST {} {} failed with status {}", method, url, status);
            return Err(map_status_to_error(status, error_message_from_body(&text)));
        }

        serde_json::from_str::<Value>(&text).map_err(|e| {
            warn!("REST {} {} returned undecodable body: {}", method, url, e);
            ApiError::Decode(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping_matrix() {
        let code = |s: StatusCode| match map_status_to_error(s, String::new()) {
            ApiError::Status { code, .. } => code,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(code(StatusCode::BAD_REQUEST), "bad_request");
        assert_eq!(code(StatusCode::UNAUTHORIZED), "unauthorized");
        assert_eq!(code(StatusCode::FORBIDDEN), "forbidden");
        assert_eq!(code(StatusCode::NOT_FOUND), "not_found");
        assert_eq!(code(StatusCode::CONFLICT), "conflict");
        assert_eq!(code(StatusCode::UNPROCESSABLE_ENTITY), "unprocessable");
        assert_eq!(code(StatusCode::TOO_MANY_REQUESTS), "rate_limited");
        assert_eq!(code(StatusCode::BAD_GATEWAY), "upstream_error");
        assert_eq!(code(StatusCode::IM_A_TEAPOT), "server_error");
    }

    #[test]
    fn github_message_extracted_from_error_body() {
        assert_eq!(
            error_message_from_body(r#"{"message":"Not Found","documentation_url":"x"}"#),
            "Not Found"
        );
        assert_eq!(error_message_from_body(" plain text \n"), "plain text");
    }

    #[test]
    fn error_display() {
        let e = map_status_to_error(StatusCode::NOT_FOUND, "Not Found".into());
        assert_eq!(e.to_string(), "Request failed: 404 (not_found): Not Found");
        assert_eq!(ApiError::MissingToken.to_string(), "GitHub API token is not set");
    }

    #[tokio::test]
    async fn missing_token_fails_without_network() {
        let cfg = Config {
            api_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        };
        let client = GitHubClient::new(Arc::new(cfg)).unwrap();
        let res = client.get("/user", &[]).await;
        assert_eq!(res, Err(ApiError::MissingToken));
    }
}
