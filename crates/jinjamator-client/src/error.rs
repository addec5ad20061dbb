use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication failed for user '{username}': HTTP {status}: {body}")]
    AuthenticationFailed {
        username: String,
        status: u16,
        body: String,
    },

    #[error("Authorization invalid (HTTP {status}), please log in: {body}")]
    AuthorizationInvalid { status: u16, body: String },

    #[error("Session expired at {expires_at}, please log in again")]
    SessionExpired { expires_at: DateTime<Utc> },

    #[error("Token renewal failed{}: {reason}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RenewalFailed { status: Option<u16>, reason: String },

    #[error("Task not found: {path}. Valid tasks:\n{}", .known_paths.join("\n"))]
    TaskNotFound {
        path: String,
        known_paths: Vec<String>,
    },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Submission of task {path} failed: HTTP {status}: {body}")]
    SubmissionFailed {
        path: String,
        status: u16,
        body: String,
    },

    #[error("File {filename} of job {job_id} not found: HTTP {status}")]
    FileNotFound {
        job_id: String,
        filename: String,
        status: u16,
    },

    #[error("Job {job_id} returned no log entries")]
    NoResults { job_id: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request to {url} failed: HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("Invalid token: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<jsonwebtoken::errors::Error> for ClientError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        ClientError::Token(e.to_string())
    }
}

impl ClientError {
    /// Errors that can only be cleared by logging in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationFailed { .. }
                | ClientError::AuthorizationInvalid { .. }
                | ClientError::SessionExpired { .. }
                | ClientError::RenewalFailed { .. }
        )
    }

    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthenticationFailed { status, .. }
            | ClientError::AuthorizationInvalid { status, .. }
            | ClientError::SubmissionFailed { status, .. }
            | ClientError::FileNotFound { status, .. }
            | ClientError::Http { status, .. } => Some(*status),
            ClientError::RenewalFailed { status, .. } => *status,
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
