use crate::http::ApiError;

/// Failure of a single tool operation. Every variant is rendered to plain
/// text at the tool boundary; none escape as a protocol fault.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid repo. Use 'owner/name'.")]
    InvalidRepo,

    #[error("Repo '{0}' not allowed by GH_ALLOWED_REPOS.")]
    NotAllowed(String),

    #[error("GitHub API token is not set")]
    MissingToken,

    #[error("{0}")]
    Api(ApiError),

    #[error("{0}")]
    Empty(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ToolError {
    pub fn empty(msg: impl Into<String>) -> Self {
        ToolError::Empty(msg.into())
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidRepo => "format_error",
            ToolError::NotAllowed(_) => "policy_error",
            ToolError::MissingToken => "auth_error",
            ToolError::Api(_) => "transport_error",
            ToolError::Empty(_) => "not_found_or_empty",
            ToolError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

impl From<ApiError> for ToolError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::MissingToken => ToolError::MissingToken,
            other => ToolError::Api(other),
        }
    }
}
