use crate::connect::{self, Target};
use jinjamator_client::Config;

pub async fn run(config: &Config, target: &Target, json: bool) -> anyhow::Result<()> {
    let session = connect::login(config, target).await?;
    let catalog = session.list_tasks().await?;

    if json {
        let tasks: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let width = catalog.iter().map(|t| t.path.len()).max().unwrap_or(0);
    for task in catalog.iter() {
        let summary = task.description.lines().next().unwrap_or("");
        println!("{:<width$}  {}", task.path, summary, width = width);
    }

    Ok(())
}
