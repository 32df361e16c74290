//! Configuration loading from disk and the process environment.
//!
//! Order of precedence, lowest first: built-in defaults, TOML file,
//! environment variables. The result is validated before it is returned.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{DeploymentMode, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Selects strict or permissive mode explicitly.
pub const MODE_VAR: &str = "FORWARDER_MODE";
/// Overrides `listener.bind_address`.
pub const BIND_VAR: &str = "FORWARDER_BIND";
/// Overrides `timeouts.default_ms`.
pub const TIMEOUT_VAR: &str = "FORWARDER_TIMEOUT_MS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Layer environment variables over `config`.
///
/// `env` returns the value of a variable; empty values count as unset.
pub fn apply_env<F>(config: &mut GatewayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|value| !value.is_empty());

    if let Some(raw) = lookup(MODE_VAR) {
        let mode = raw.parse::<DeploymentMode>().map_err(|_| ConfigError::Env {
            var: MODE_VAR.to_string(),
            value: raw.clone(),
        })?;
        config.mode = Some(mode);
    } else if config.mode.is_none() {
        let production = lookup("NODE_ENV").as_deref() == Some("production")
            || lookup("VERCEL").is_some();
        config.mode = Some(if production {
            DeploymentMode::Strict
        } else {
            DeploymentMode::Permissive
        });
    }

    if let Some(bind) = lookup(BIND_VAR) {
        config.listener.bind_address = bind;
    }

    if let Some(raw) = lookup(TIMEOUT_VAR) {
        config.timeouts.default_ms = parse_millis(TIMEOUT_VAR, &raw)?;
    }

    for service in &mut config.services {
        if let Some(url) = service.base_url_env.iter().find_map(|var| lookup(var.as_str())) {
            service.base_url = Some(url);
        }

        let var = service.timeout_env_var();
        if let Some(raw) = lookup(var.as_str()) {
            service.timeout_ms = Some(parse_millis(&var, &raw)?);
        }
    }

    Ok(())
}

fn parse_millis(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: raw.to_string(),
    })
}

/// Build the effective configuration: optional file, then environment, then validation.
pub fn load<F>(path: Option<&Path>, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// [`load`] against the real process environment.
pub fn load_from_process(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load(path, |key| std::env::var(key).ok())
}
