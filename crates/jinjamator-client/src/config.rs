use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest sleep `Job::wait` takes between polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime settings for one [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// API root, e.g. `http://localhost:5000/api`.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Applied to file downloads instead of `request_timeout`.
    pub download_timeout: Duration,
    /// Fixed sleep between status polls in `Job::wait`.
    pub poll_interval: Duration,
}

impl ConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            download_timeout: Duration::from_secs(default_download_timeout_secs()),
            poll_interval: Duration::from_secs(default_poll_interval_secs()),
        }
    }

    /// Clamped to [`MIN_POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}

/// Client configuration file.
/// Loaded from ~/.config/jinjamator/client.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    #[serde(default)]
    pub defaults: Defaults,
}

/// One Jinjamator server and the identity used against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            wait_timeout_secs: default_wait_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_wait_timeout_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    600
}

impl Config {
    /// Load config from the default path (~/.config/jinjamator/client.yaml).
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::empty())
        }
    }

    /// Parse a config file; YAML errors name the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        if config.defaults.poll_interval_secs == 0 {
            return Err(ClientError::Config(format!(
                "{}: defaults.poll_interval_secs must be at least 1",
                path.display()
            )));
        }
        Ok(config)
    }

    /// `<config dir>/jinjamator/client.yaml`, falling back to `/etc`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("jinjamator")
            .join("client.yaml")
    }

    /// Empty config with no profiles.
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
            defaults: Defaults::default(),
        }
    }

    /// Find a profile by name.
    pub fn find_profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Connection settings for a base URL, using the configured defaults.
    pub fn connection(&self, base_url: impl Into<String>) -> ConnectionConfig {
        ConnectionConfig::new(base_url)
            .with_poll_interval(Duration::from_secs(self.defaults.poll_interval_secs))
            .with_request_timeout(Duration::from_secs(self.defaults.request_timeout_secs))
            .with_download_timeout(Duration::from_secs(self.defaults.download_timeout_secs))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.wait_timeout_secs)
    }
}
