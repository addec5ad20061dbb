use crate::connect::{self, Target};
use jinjamator_client::{Config, LogLevel};

pub async fn run(
    config: &Config,
    target: &Target,
    job_id: &str,
    level: &str,
    json: bool,
) -> anyhow::Result<()> {
    let level: LogLevel = level.parse()?;
    let session = connect::login(config, target).await?;
    let results = session.job(job_id).logs(level).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(results.raw())?);
        return Ok(());
    }

    for (timestamp, message) in results.log_entries() {
        println!("{}  {}", timestamp, message);
    }
    if !results.files().is_empty() {
        println!();
        println!("Files:");
        for file in results.files() {
            println!("  - {}", file);
        }
    }

    Ok(())
}
