//! Environment handling: `.env` files, `${VAR}` substitution, and the legacy
//! variable-only configuration.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are substituted. `$${VAR}` is an
//! escape for a literal `${VAR}`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::schema::{DiscordConfig, RunProfile, StaytimeConfig};

/// Bot token variable used by deployments without a config file.
pub const LEGACY_TOKEN_VAR: &str = "DISCORDTOKEN";
pub const LEGACY_TEXT_CHANNEL_VAR: &str = "DISCORDTEXTCHANNELID";
pub const LEGACY_VOICE_CHANNEL_VAR: &str = "DISCORDVOICECHANNELID";

/// Selects the run profile when no CLI flag does.
pub const PROFILE_VAR: &str = "STAYTIME_PROFILE";

/// `${NAME}` with an optional leading `$` marking an escape.
static ENV_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("env reference pattern is valid")
});

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Load the profile's env file, then `.env`, from `dir`.
///
/// Variables already set in the process win over both files. Missing files
/// are skipped. Returns the files that were read.
pub fn load_env_files(dir: &Path, profile: RunProfile) -> Vec<String> {
    let mut loaded = Vec::new();
    for name in [profile.env_file(), ".env"] {
        let path = dir.join(name);
        match dotenvy::from_path(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Loaded env file");
                loaded.push(name.to_string());
            }
            Err(e) if e.not_found() => {}
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable env file"),
        }
    }
    loaded
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references from `env`.
///
/// Fails on the first reference to a variable that is unset or empty.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let out = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(out.into_owned())
}

/// Whether a string contains an unescaped `${VAR}` reference.
pub fn contains_env_var_reference(s: &str) -> bool {
    ENV_REF.captures_iter(s).any(|c| c[1].is_empty())
}

/// Build a config from the three legacy variables alone.
pub fn config_from_legacy_env(env: &HashMap<String, String>) -> StaytimeConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();
    StaytimeConfig {
        discord: Some(DiscordConfig {
            bot_token: get(LEGACY_TOKEN_VAR),
            voice_channel_id: get(LEGACY_VOICE_CHANNEL_VAR),
            text_channel_id: get(LEGACY_TEXT_CHANNEL_VAR),
        }),
        ..Default::default()
    }
}
