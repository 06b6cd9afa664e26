//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, GatewayConfig};
use crate::config::validation::{validate_config, ConfigIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto a parsed configuration.
///
/// Lookup is injected so tests never touch the real process environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(secret) = non_empty("TURNSTILE_SECRET_KEY") {
        config.turnstile.secret_key = Some(secret);
    }
    if let Some(site) =
        non_empty("TURNSTILE_SITE_KEY").or_else(|| non_empty("NEXT_PUBLIC_TURNSTILE_SITE_KEY"))
    {
        config.turnstile.site_key = Some(site);
    }
    if let Some(skip) = non_empty("SKIP_TURNSTILE") {
        config.turnstile.skip = skip.trim().eq_ignore_ascii_case("true");
    }
    if let Some(token) = non_empty("POLLINATIONS_API_TOKEN") {
        config.upstream.api_token = Some(token);
    }
    if let Some(referrer) = non_empty("POLLINATIONS_REFERRER") {
        config.upstream.referrer = Some(referrer);
    }
    if let Some(env) = non_empty("APP_ENV").and_then(|v| Environment::parse(&v)) {
        config.environment = env;
    }
    if let Some(key) = non_empty("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
}
