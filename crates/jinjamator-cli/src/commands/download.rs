use crate::connect::{self, Target};
use anyhow::anyhow;
use jinjamator_client::Config;
use std::path::{Path, PathBuf};

pub async fn run(
    config: &Config,
    target: &Target,
    job_id: &str,
    filename: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let destination = match output {
        Some(path) => path,
        None => Path::new(filename)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Cannot derive a local name from {:?}, pass --output", filename))?,
    };

    let session = connect::login(config, target).await?;
    let saved = session.job(job_id).save_to(filename, &destination).await?;
    println!("Saved {} to {}", filename, saved.display());

    Ok(())
}
