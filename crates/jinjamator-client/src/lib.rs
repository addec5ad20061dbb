//! Client for the Jinjamator task execution API.
//!
//! ```no_run
//! use jinjamator_client::Session;
//! use std::time::Duration;
//!
//! # async fn example() -> jinjamator_client::Result<()> {
//! let session = Session::connect("http://localhost:5000/api")?;
//! session.login("root", "secret").await?;
//!
//! let mut task = session.get_task("vendor/generic/ssh/collect_raw_output").await?;
//! task.set("command", "show run").set("ssh_host", "100.76.0.1");
//!
//! let mut job = task.submit_and_wait(Duration::from_secs(600)).await?;
//! println!("{}", job.results().await?.last_message()?);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod results;
pub mod session;
pub mod task;
pub mod token;
mod transport;

pub use catalog::{TaskCatalog, TaskDescriptor};
pub use config::{Config, ConnectionConfig};
pub use error::{ClientError, Result};
pub use job::{Job, JobState, LogLevel};
pub use results::{FileDownload, LogEntry, ResultSet};
pub use session::Session;
pub use task::{TaskConfiguration, TaskInvocation};
pub use token::{Freshness, TokenState};
