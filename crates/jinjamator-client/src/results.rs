use crate::error::{ClientError, Result};
use crate::job::JobState;
use crate::session::Session;
use crate::transport::ApiRequest;
use bytes::Bytes;
use reqwest::Response;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

/// Write granularity when saving a download to disk.
pub const SAVE_CHUNK_SIZE: usize = 4096;

/// One log line: `{ "<timestamp>": <record> }` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub record: Value,
}

impl LogEntry {
    /// The record's `message` field, the record itself when it is a bare
    /// string, or its JSON text otherwise.
    pub fn message(&self) -> String {
        match &self.record {
            Value::String(s) => s.clone(),
            Value::Object(fields) => match fields.get("message") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => self.record.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Snapshot of a job's log and produced files from a single fetch.
#[derive(Debug, Clone)]
pub struct ResultSet {
    session: Session,
    job_id: String,
    state: Option<JobState>,
    task_path: Option<String>,
    log: Vec<LogEntry>,
    files: Vec<String>,
    raw: Value,
}

impl ResultSet {
    pub(crate) fn from_raw(session: Session, job_id: String, raw: Value) -> Result<Self> {
        let invalid = |reason: String| ClientError::InvalidResponse {
            url: format!("{}/jobs/{}", session.base_url(), job_id),
            reason,
        };

        let log = match raw.get("log") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_log_item(item).ok_or_else(|| invalid(format!("malformed log entry #{}: {}", i, item))))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(invalid(format!("'log' is not a list: {}", other))),
        };

        let files = match raw.get("files") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|f| f.as_str().map(str::to_string).ok_or_else(|| invalid(format!("file name is not a string: {}", f))))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(invalid(format!("'files' is not a list: {}", other))),
        };

        let state = raw.get("state").and_then(Value::as_str).map(JobState::parse);
        let task_path = raw
            .get("jinjamator_task")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            session,
            job_id,
            state,
            task_path,
            log,
            files,
            raw,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// State reported alongside the results, if the server sent one.
    pub fn state(&self) -> Option<&JobState> {
        self.state.as_ref()
    }

    pub fn task_path(&self) -> Option<&str> {
        self.task_path.as_deref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// `(timestamp, message)` pairs in server order.
    pub fn log_entries(&self) -> Vec<(String, String)> {
        self.log
            .iter()
            .map(|e| (e.timestamp.clone(), e.message()))
            .collect()
    }

    pub fn last_message(&self) -> Result<String> {
        self.log
            .last()
            .map(LogEntry::message)
            .ok_or_else(|| ClientError::NoResults {
                job_id: self.job_id.clone(),
            })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Open a produced file for streaming.
    pub async fn download(&self, filename: &str) -> Result<FileDownload> {
        open_download(&self.session, &self.job_id, filename).await
    }

    /// Stream a produced file to `destination`. The file is written in
    /// place; a failure part way leaves the partial file behind.
    pub async fn save_to(&self, filename: &str, destination: impl AsRef<Path>) -> Result<PathBuf> {
        save_download(&self.session, &self.job_id, filename, destination.as_ref()).await
    }
}

pub(crate) async fn open_download(session: &Session, job_id: &str, filename: &str) -> Result<FileDownload> {
    let request = ApiRequest::get(format!(
        "/files/download/{}/{}",
        job_id,
        urlencoding::encode(filename)
    ))
    .timeout(session.config().download_timeout);

    let response = session.execute(request).await?;
    if !response.status().is_success() {
        return Err(ClientError::FileNotFound {
            job_id: job_id.to_string(),
            filename: filename.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(FileDownload { response })
}

pub(crate) async fn save_download(
    session: &Session,
    job_id: &str,
    filename: &str,
    destination: &Path,
) -> Result<PathBuf> {
    let mut download = open_download(session, job_id, filename).await?;

    let file = tokio::fs::File::create(destination).await?;
    let mut writer = BufWriter::with_capacity(SAVE_CHUNK_SIZE, file);
    let mut written: u64 = 0;
    while let Some(chunk) = download.chunk().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    info!(
        "Saved {} of job {} to {} ({} bytes)",
        filename,
        job_id,
        destination.display(),
        written
    );
    Ok(destination.to_path_buf())
}

fn parse_log_item(item: &Value) -> Option<LogEntry> {
    let (timestamp, record) = item.as_object()?.iter().next()?;
    Some(LogEntry {
        timestamp: timestamp.clone(),
        record: record.clone(),
    })
}

/// Body of a file download, read chunk by chunk.
#[derive(Debug)]
pub struct FileDownload {
    response: Response,
}

impl FileDownload {
    /// Size announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Next piece of the body, `None` at the end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.response.chunk().await?)
    }

    /// Read the remaining body into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        Ok(self.response.bytes().await?)
    }
}
