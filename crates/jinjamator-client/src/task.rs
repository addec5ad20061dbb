use crate::catalog::TaskDescriptor;
use crate::error::{ClientError, Result};
use crate::job::Job;
use crate::session::Session;
use crate::transport::{self, ApiRequest};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::info;

/// Key the server reads to pick an output plugin.
pub const OUTPUT_PLUGIN_KEY: &str = "output_plugin";

/// Task variables, kept in insertion order. The server validates them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskConfiguration {
    values: Map<String, Value>,
}

impl TaskConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frozen copy sent as the request body.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TaskConfiguration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// A task plus the variables for its next run.
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    session: Session,
    descriptor: TaskDescriptor,
    pub configuration: TaskConfiguration,
}

impl TaskInvocation {
    pub(crate) fn new(session: Session, descriptor: TaskDescriptor) -> Self {
        Self {
            session,
            descriptor,
            configuration: TaskConfiguration::new(),
        }
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    /// Chainable form of `configuration.set`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.configuration.set(key, value);
        self
    }

    pub fn set_output_plugin(&mut self, name: &str) -> &mut Self {
        self.set(OUTPUT_PLUGIN_KEY, name)
    }

    /// Full configuration schema of the task, passed through untouched.
    pub async fn schema(&self) -> Result<Value> {
        let request = ApiRequest::get(self.endpoint()).query("schema-type", "full");
        let response = self.session.execute(request).await?;
        let response = transport::expect_success(response).await?;
        transport::read_json(response).await
    }

    /// Post the current configuration and hand back the new job.
    pub async fn submit(&self) -> Result<Job> {
        let body = self.configuration.snapshot();
        let response = self
            .session
            .execute(ApiRequest::post(self.endpoint(), body))
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::SubmissionFailed {
                path: self.descriptor.path.clone(),
                status: response.status().as_u16(),
                body: transport::body_snippet(response).await,
            });
        }

        let submitted: SubmitResponse = transport::read_json(response).await?;
        info!("Submitted {} as job {}", self.descriptor.path, submitted.job_id);
        Ok(self.session.job(submitted.job_id))
    }

    /// Submit, then poll until the job finishes or `timeout` runs out.
    pub async fn submit_and_wait(&self, timeout: Duration) -> Result<Job> {
        let mut job = self.submit().await?;
        job.wait(timeout).await?;
        Ok(job)
    }

    fn endpoint(&self) -> String {
        format!("/tasks/{}", self.descriptor.path.trim_start_matches('/'))
    }
}
