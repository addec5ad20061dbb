use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod connect;

#[derive(Parser)]
#[command(name = "jinjamator")]
#[command(about = "Run and inspect Jinjamator tasks", long_about = None)]
struct Cli {
    /// Profile from the config file (defaults to the first one)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// API root, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    url: Option<String>,

    /// Login name, overrides the profile
    #[arg(short, long, global = true)]
    username: Option<String>,

    #[arg(long, env = "JINJAMATOR_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tasks the server offers
    Tasks {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Submit a task
    Run {
        /// Task path, e.g. vendor/generic/ssh/collect_raw_output
        task: String,

        /// Configuration value as key=value (JSON values are parsed)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Seconds to wait for the job (defaults to the config value)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Return right after submission
        #[arg(short, long)]
        detach: bool,

        /// Download every produced file into this directory
        #[arg(long, value_name = "DIR")]
        save_files: Option<PathBuf>,
    },

    /// Show job status
    Status {
        /// Job ID
        job_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show job log
    Results {
        /// Job ID
        job_id: String,

        /// DEBUG, INFO, WARNING, ERROR or TASKLET_RESULT
        #[arg(short, long, default_value = "INFO")]
        level: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Download a file produced by a job
    Download {
        /// Job ID
        job_id: String,

        /// File name as listed by `results`
        filename: String,

        /// Destination (defaults to the file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or create the config file
    Config {
        /// Print the config path only
        #[arg(long)]
        path: bool,

        /// Write a sample config
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let target = connect::Target {
        profile: cli.profile,
        url: cli.url,
        username: cli.username,
        password: cli.password,
    };

    use Commands::*;

    match cli.command {
        Tasks { json } => {
            let config = load_config()?;
            commands::tasks(&config, &target, json).await?;
        }
        Run { task, set, timeout, detach, save_files } => {
            let config = load_config()?;
            let options = commands::run::RunOptions {
                settings: set,
                timeout,
                detach,
                save_files,
            };
            commands::run(&config, &target, &task, options).await?;
        }
        Status { job_id, json } => {
            let config = load_config()?;
            commands::status(&config, &target, &job_id, json).await?;
        }
        Results { job_id, level, json } => {
            let config = load_config()?;
            commands::results(&config, &target, &job_id, &level, json).await?;
        }
        Download { job_id, filename, output } => {
            let config = load_config()?;
            commands::download(&config, &target, &job_id, &filename, output).await?;
        }
        Config { path, init } => {
            commands::config(path, init)?;
        }
    }

    Ok(())
}

fn load_config() -> Result<jinjamator_client::Config> {
    Ok(jinjamator_client::Config::load_default()?)
}
