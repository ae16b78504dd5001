//! `staytime-config`: runtime configuration for the staytime tracker.
//!
//! Provides:
//! - Typed config schema (Discord ids, leaderboard, directory, logging)
//! - YAML loading with `${ENV_VAR}` substitution and `.env` files
//! - Fallback to the legacy `DISCORD*` variables when no file exists
//! - Default value application and validation
//! - Redaction for safe logging

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    config_from_legacy_env, contains_env_var_reference, load_env_files, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_raw_config, parse_config};
pub use redact::redact;
pub use schema::{DirectoryBackend, RunProfile, StaytimeConfig};
pub use validation::{validate, ConfigValidationError, Purpose, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Where and how to load the config.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit config file; defaults to `config_dir()/config.yaml`.
    pub path: Option<PathBuf>,
    /// Overrides both the file and `STAYTIME_PROFILE`.
    pub profile: Option<RunProfile>,
    /// Directory searched for `.env.<profile>` and `.env`.
    pub env_dir: PathBuf,
    pub purpose: Purpose,
}

impl LoadOptions {
    pub fn new(purpose: Purpose) -> Self {
        Self {
            path: None,
            profile: None,
            env_dir: PathBuf::from("."),
            purpose,
        }
    }
}

/// A validated config plus the warnings found while validating it.
///
/// Loading usually happens before logging is installed, so warnings are
/// handed back for the caller to log.
#[derive(Debug)]
pub struct Loaded {
    pub config: StaytimeConfig,
    pub warnings: Vec<ConfigValidationError>,
}

/// Load env files and the config file, then substitute, default and validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(opts: &LoadOptions) -> Result<Loaded> {
    let profile = match opts.profile {
        Some(p) => p,
        None => match std::env::var(env::PROFILE_VAR) {
            Ok(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            Err(_) => RunProfile::default(),
        },
    };

    let loaded = load_env_files(&opts.env_dir, profile);
    tracing::debug!(profile = %profile, files = ?loaded, "Environment prepared");

    let path = opts
        .path
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let mut raw = load_raw_config(&path).await?;
    match (&mut raw, opts.profile) {
        (None, _) => {
            tracing::info!(path = %path.display(), "No config file; using DISCORD* environment variables");
        }
        (Some(Value::Object(map)), Some(explicit)) => {
            map.insert("profile".into(), Value::String(explicit.to_string()));
        }
        _ => {}
    }

    let env: HashMap<String, String> = std::env::vars().collect();
    prepare(raw, &env, Some(profile), opts.purpose)
}

/// Turn an optional raw config tree into a validated config.
///
/// `profile` is applied only when the file does not set one.
pub fn prepare(
    raw: Option<Value>,
    env: &HashMap<String, String>,
    profile: Option<RunProfile>,
    purpose: Purpose,
) -> Result<Loaded> {
    let mut config = match raw {
        Some(value) => {
            let value =
                resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
            parse_config(value)?
        }
        None => config_from_legacy_env(env),
    };

    if let Some(p) = profile {
        if config.profile.is_none() {
            config.profile = Some(p);
        }
    }

    let config = apply_all_defaults(config);

    let report = validate(&config, purpose);
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("invalid configuration: {}", summary.join("; "));
    }

    Ok(Loaded {
        config,
        warnings: report.warnings,
    })
}

impl Loaded {
    /// Log the warnings and the redacted effective config.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        if let Ok(value) = serde_json::to_value(&self.config) {
            tracing::debug!(config = %redact(&value), "Effective config");
        }
    }
}
