use jinjamator_client::Config;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# Jinjamator client configuration
# The password may be left out and given via JINJAMATOR_PASSWORD instead.

profiles:
  - name: lab
    base_url: http://localhost:5000/api
    username: root

  - name: prod
    base_url: https://jinjamator.example.com/api
    username: automation

defaults:
  poll_interval_secs: 1
  wait_timeout_secs: 600
  request_timeout_secs: 30
  download_timeout_secs: 600
"#;

pub fn run(path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = Config::default_path();
    if path {
        println!("{}", config_path.display());
    } else if init {
        write_sample(&config_path)?;
    } else {
        show(&config_path)?;
    }
    Ok(())
}

fn write_sample(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Not overwriting existing {}", config_path.display());
        return Ok(());
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, SAMPLE_CONFIG)?;
    println!("Wrote sample profiles to {}", config_path.display());
    Ok(())
}

fn show(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("No config at {}", config_path.display());
        println!("Create one with `jinjamator config --init`, or pass --url and --username.");
        return Ok(());
    }

    let config = Config::load_from(config_path)?;
    println!("Config:   {}", config_path.display());
    println!("Polling:  every {}s, up to {}s", config.defaults.poll_interval_secs, config.defaults.wait_timeout_secs);
    for (i, p) in config.profiles.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!(
            " {} {:<12} {} (user {})",
            marker,
            p.name,
            p.base_url,
            p.username.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[0].name, "lab");
        assert!(config.profiles[0].password.is_none());
        assert_eq!(config.defaults.poll_interval_secs, 1);
    }
}
