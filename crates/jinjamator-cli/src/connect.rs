use anyhow::{anyhow, Context};
use jinjamator_client::config::ProfileConfig;
use jinjamator_client::{Config, Session};
use tracing::debug;

/// Server and identity as given on the command line.
pub struct Target {
    pub profile: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Resolve the profile, then open and log in a session.
pub async fn login(config: &Config, target: &Target) -> anyhow::Result<Session> {
    let profile = resolve_profile(config, target.profile.as_deref())?;

    let base_url = target
        .url
        .clone()
        .or_else(|| profile.map(|p| p.base_url.clone()))
        .context("No server configured: pass --url or add a profile")?;
    let username = target
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()))
        .context("No username: pass --username or set it in the profile")?;
    let password = target
        .password
        .clone()
        .or_else(|| profile.and_then(|p| p.password.clone()))
        .context("No password: set JINJAMATOR_PASSWORD or add it to the profile")?;

    debug!(
        "Connecting to {} as {} (profile {})",
        base_url,
        username,
        profile.map(|p| p.name.as_str()).unwrap_or("-")
    );
    let session = Session::new(config.connection(base_url))?;
    session
        .login(&username, &password)
        .await
        .with_context(|| format!("Login to {} failed", session.base_url()))?;
    Ok(session)
}

fn resolve_profile<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> anyhow::Result<Option<&'a ProfileConfig>> {
    match name {
        Some(name) => config
            .find_profile(name)
            .map(Some)
            .ok_or_else(|| anyhow!("Profile not found: {}", name)),
        None => Ok(config.profiles.first()),
    }
}
