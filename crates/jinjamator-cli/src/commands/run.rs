use crate::commands::status::print_status;
use crate::connect::{self, Target};
use anyhow::{anyhow, bail};
use jinjamator_client::{Config, JobState, ResultSet};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct RunOptions {
    pub settings: Vec<String>,
    pub timeout: Option<u64>,
    pub detach: bool,
    pub save_files: Option<PathBuf>,
}

pub async fn run(
    config: &Config,
    target: &Target,
    task_path: &str,
    options: RunOptions,
) -> anyhow::Result<()> {
    let session = connect::login(config, target).await?;
    let mut task = session.get_task(task_path).await?;
    for setting in &options.settings {
        let (key, value) = parse_setting(setting)?;
        task.set(key, value);
    }

    let mut job = task.submit().await?;
    println!("Job submitted:");
    println!("  ID:       {}", job.id());
    println!("  Task:     {}", task.path());

    if options.detach {
        return Ok(());
    }

    let timeout = options
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.wait_timeout());
    let state = job.wait(timeout).await?;
    if !state.is_terminal() {
        println!(
            "Job still {} after {}s, check later with `jinjamator status {}`",
            state,
            timeout.as_secs(),
            job.id()
        );
        return Ok(());
    }

    print_status(&job);
    let results = job.results().await?;
    if let Ok(message) = results.last_message() {
        println!("   Result:   {}", message);
    }

    if let Some(dir) = options.save_files {
        save_all(&results, &dir).await?;
    }

    if state == JobState::Failure {
        bail!("Job {} failed", job.id());
    }
    Ok(())
}

async fn save_all(results: &ResultSet, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    for filename in results.files() {
        let local = Path::new(filename)
            .file_name()
            .ok_or_else(|| anyhow!("Refusing to save file with no name: {:?}", filename))?;
        let saved = results.save_to(filename, dir.join(local)).await?;
        println!("   Saved:    {}", saved.display());
    }
    Ok(())
}

/// Split `key=value`; the value is JSON when it parses, a string otherwise.
fn parse_setting(setting: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = setting
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got: {}", setting))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Empty key in: {}", setting);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_setting() {
        assert_eq!(
            parse_setting("command=show run").unwrap(),
            ("command".to_string(), json!("show run"))
        );
        assert_eq!(parse_setting("ssh_port=22").unwrap().1, json!(22));
        assert_eq!(parse_setting("hosts=[\"a\",\"b\"]").unwrap().1, json!(["a", "b"]));
        assert_eq!(parse_setting("note=a=b").unwrap().1, json!("a=b"));
        assert_eq!(parse_setting("empty=").unwrap().1, json!(""));
    }

    #[test]
    fn test_parse_setting_rejects_missing_key() {
        assert!(parse_setting("command").is_err());
        assert!(parse_setting("=value").is_err());
    }
}
