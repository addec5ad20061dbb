use crate::config::MIN_POLL_INTERVAL;
use crate::error::{ClientError, Result};
use crate::results::{self, FileDownload, ResultSet};
use crate::session::Session;
use crate::transport::{self, ApiRequest};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Execution state as last seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobState {
    /// No status fetched yet.
    Unknown,
    Pending,
    Running,
    Success,
    Failure,
    /// Any other state the server reports.
    Other(String),
}

impl JobState {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => JobState::Unknown,
            "PENDING" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "SUCCESS" => JobState::Success,
            "FAILURE" => JobState::Failure,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Unknown => write!(f, "UNKNOWN"),
            JobState::Pending => write!(f, "PENDING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Success => write!(f, "SUCCESS"),
            JobState::Failure => write!(f, "FAILURE"),
            JobState::Other(s) => write!(f, "{}", s),
        }
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobState::parse(&s))
    }
}

/// Verbosity of the log returned with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    /// Only the tasklet results; what status polls use.
    TaskletResult,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::TaskletResult => "TASKLET_RESULT",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "TASKLET_RESULT" => Ok(LogLevel::TaskletResult),
            _ => Err(ClientError::Config(format!("unknown log level '{}'", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: JobState,
    #[serde(default)]
    jinjamator_task: Option<String>,
}

/// One server-side execution. The state only changes when polled.
#[derive(Debug, Clone)]
pub struct Job {
    session: Session,
    id: String,
    state: JobState,
    task_path: Option<String>,
}

impl Job {
    pub(crate) fn new(session: Session, id: String) -> Self {
        Self {
            session,
            id,
            state: JobState::Unknown,
            task_path: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn task_path(&self) -> Option<&str> {
        self.task_path.as_deref()
    }

    /// Fetch one status snapshot and remember it.
    pub async fn status(&mut self) -> Result<JobState> {
        let response = self.fetch(LogLevel::TaskletResult).await?;
        let status: StatusResponse = transport::read_json(response).await?;

        if status.state != self.state {
            debug!("Job {}: {} -> {}", self.id, self.state, status.state);
        }
        self.state = status.state;
        if status.jinjamator_task.is_some() {
            self.task_path = status.jinjamator_task;
        }
        Ok(self.state.clone())
    }

    /// Poll until the job is terminal or `timeout` has elapsed, sleeping the
    /// session's poll interval in between. Running out of time is not an
    /// error: the last observed state is returned. A zero timeout polls once.
    pub async fn wait(&mut self, timeout: Duration) -> Result<JobState> {
        let interval = self.session.config().poll_interval.max(MIN_POLL_INTERVAL);
        let deadline = Instant::now() + timeout;

        loop {
            let state = self.status().await?;
            if state.is_terminal() {
                info!("Job {} finished: {}", self.id, state);
                return Ok(state);
            }

            let now = Instant::now();
            if now >= deadline {
                info!("Job {} still {} after {:?}", self.id, state, timeout);
                return Ok(state);
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }

    /// Fetch the job's results at INFO level. A job never polled gets one
    /// status call first so state and task path are known.
    pub async fn results(&mut self) -> Result<ResultSet> {
        if self.state == JobState::Unknown {
            self.status().await?;
        }
        self.logs(LogLevel::Info).await
    }

    /// Fetch the job's results at an explicit log level.
    pub async fn logs(&self, level: LogLevel) -> Result<ResultSet> {
        let response = self.fetch(level).await?;
        let raw: serde_json::Value = transport::read_json(response).await?;
        ResultSet::from_raw(self.session.clone(), self.id.clone(), raw)
    }

    /// Open a file the job produced, without fetching its results first.
    pub async fn download(&self, filename: &str) -> Result<FileDownload> {
        results::open_download(&self.session, &self.id, filename).await
    }

    /// Stream a file the job produced to `destination`, see
    /// [`ResultSet::save_to`].
    pub async fn save_to(&self, filename: &str, destination: impl AsRef<Path>) -> Result<PathBuf> {
        results::save_download(&self.session, &self.id, filename, destination.as_ref()).await
    }

    async fn fetch(&self, level: LogLevel) -> Result<Response> {
        let request =
            ApiRequest::get(format!("/jobs/{}", self.id)).query("log-level", level.as_str());
        let response = self.session.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::JobNotFound {
                job_id: self.id.clone(),
            });
        }
        transport::expect_success(response).await
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_states() {
        assert_eq!(JobState::parse("PENDING"), JobState::Pending);
        assert_eq!(JobState::parse("running"), JobState::Running);
        assert_eq!(JobState::parse("SUCCESS"), JobState::Success);
        assert_eq!(JobState::parse("FAILURE"), JobState::Failure);
        assert_eq!(JobState::parse("REVOKED"), JobState::Other("REVOKED".into()));
    }

    #[test]
    fn test_only_success_and_failure_are_terminal() {
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failure.is_terminal());
        assert!(!JobState::Unknown.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Other("PROGRESS".into()).is_terminal());
    }

    #[test]
    fn test_state_display_round_trips_through_parse() {
        for state in [JobState::Pending, JobState::Running, JobState::Other("RETRY".into())] {
            assert_eq!(JobState::parse(&state.to_string()), state);
        }
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("tasklet_result".parse::<LogLevel>().unwrap(), LogLevel::TaskletResult);
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
