use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One task as advertised by `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub path: String,
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub base_dir: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskList {
    #[serde(default)]
    pub tasks: Vec<TaskDescriptor>,
}

/// Task ids come back as strings or numbers depending on the server version.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Tasks keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCatalog {
    tasks: BTreeMap<String, TaskDescriptor>,
}

impl TaskCatalog {
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = TaskDescriptor>) -> Self {
        Self {
            tasks: descriptors
                .into_iter()
                .map(|d| (d.path.clone(), d))
                .collect(),
        }
    }

    /// Look up a task; the error lists every valid path.
    pub fn get(&self, path: &str) -> Result<&TaskDescriptor> {
        self.tasks.get(path).ok_or_else(|| ClientError::TaskNotFound {
            path: path.to_string(),
            known_paths: self.paths(),
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tasks.contains_key(path)
    }

    /// All task paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
