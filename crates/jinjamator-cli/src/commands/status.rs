use crate::connect::{self, Target};
use jinjamator_client::{Config, Job};

pub async fn run(config: &Config, target: &Target, job_id: &str, json: bool) -> anyhow::Result<()> {
    let session = connect::login(config, target).await?;
    let mut job = session.job(job_id);
    job.status().await?;

    if json {
        let out = serde_json::json!({
            "job_id": job.id(),
            "state": job.state().to_string(),
            "task": job.task_path(),
            "terminal": job.state().is_terminal(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_status(&job);
    }

    Ok(())
}

pub fn print_status(job: &Job) {
    println!("   Job:      {}", job.id());
    println!("   Task:     {}", job.task_path().unwrap_or("N/A"));
    println!("   State:    {}", job.state());
}
