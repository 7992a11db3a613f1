use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("model returned no recoverable JSON object:\n{raw}")]
    MalformedResponse { raw: String },
    #[error("authentication failed: {0}")] Auth(String),
    #[error("could not create repository: {0}")] RepoCreate(String),
    #[error("could not confirm repository exists: {0}")] RepoLookup(String),
    #[error("no files were uploaded: {0}")] Upload(String),
    #[error("provider error: {0}")] Provider(String),
    #[error("invalid file path: {0}")] InvalidPath(String),
    #[error("config error: {0}")] Config(String),
    #[error(transparent)] Io(#[from] std::io::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
}

/// Transport-level failure talking to the hosting service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostingError {
    #[error("request failed: {0}")] Transport(String),
    #[error("status {status}: {message}")] Status { status: u16, message: String },
    #[error("unexpected response: {0}")] Decode(String),
}

impl HostingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            HostingError::Transport(_) => true,
            HostingError::Status { status, .. } => *status >= 500,
            HostingError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for HostingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HostingError::Transport(format!("timed out: {err}"))
        } else {
            HostingError::Transport(err.to_string())
        }
    }
}

pub type SiteResult<T> = Result<T, SiteError>;
