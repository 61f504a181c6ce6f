//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read a `.env` file from the working directory if one exists
//! 2. Attempt to load from environment variables
//! 3. If a required variable is missing, fall back to a config file
//! 4. Config files may be JSON or TOML (detected by extension)
//!
//! ## Environment Variables
//! Required:
//! - `MEALSCRIBE_FITBIT_CLIENT_ID`: OAuth client id
//! - `MEALSCRIBE_REDIRECT_SCHEME` (native shell) or
//!   `MEALSCRIBE_REDIRECT_ORIGIN` (browser build)
//! - `MEALSCRIBE_OPENAI_API_KEY`: completion API key
//!
//! Optional:
//! - `MEALSCRIBE_REDIRECT_PATH`: path after the custom scheme (default `auth`)
//! - `MEALSCRIBE_FITBIT_SCOPE`, `MEALSCRIBE_FITBIT_AUTHORIZE_URL`,
//!   `MEALSCRIBE_FITBIT_API_URL`, `MEALSCRIBE_TOKEN_LIFETIME_SECS`
//! - `MEALSCRIBE_OPENAI_MODEL`, `MEALSCRIBE_OPENAI_API_URL`,
//!   `MEALSCRIBE_OPENAI_MAX_TOKENS`, `MEALSCRIBE_OPENAI_TEMPERATURE`
//! - `MEALSCRIBE_HTTP_TIMEOUT_SECS`, `MEALSCRIBE_HTTP_MAX_ATTEMPTS`
//! - `MEALSCRIBE_KEYCHAIN_SERVICE`
//!
//! ## File Locations
//! The loader probes, in order, `mealscribe.{toml,json}` and
//! `config.{toml,json}` in the working directory, its parent and
//! grandparent, then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use mealscribe_domain::{
    CompletionConfig, Config, HttpConfig, MealscribeError, ProviderConfig, RedirectTarget, Result,
    StorageConfig,
};

const FILE_NAMES: [&str; 4] = ["mealscribe.toml", "mealscribe.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MealscribeError::Config` if neither source yields a complete,
/// valid configuration.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from process environment variables
///
/// # Errors
/// Returns `MealscribeError::Config` if a required variable is missing or a
/// value cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any key lookup (the process environment in
/// production).
fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvSource(lookup);

    let scheme = env.get("MEALSCRIBE_REDIRECT_SCHEME");
    let origin = env.get("MEALSCRIBE_REDIRECT_ORIGIN");
    let redirect = match (scheme, origin) {
        (Some(scheme), _) => RedirectTarget::Native {
            scheme,
            path: env.get("MEALSCRIBE_REDIRECT_PATH").unwrap_or_else(|| "auth".to_string()),
        },
        (None, Some(origin)) => RedirectTarget::Browser { origin },
        (None, None) => {
            return Err(MealscribeError::Config(
                "Missing required environment variable: \
                 MEALSCRIBE_REDIRECT_SCHEME or MEALSCRIBE_REDIRECT_ORIGIN"
                    .into(),
            ))
        }
    };

    let mut provider = ProviderConfig::new(env.required("MEALSCRIBE_FITBIT_CLIENT_ID")?, redirect);
    if let Some(scope) = env.get("MEALSCRIBE_FITBIT_SCOPE") {
        provider.scope = scope;
    }
    if let Some(url) = env.get("MEALSCRIBE_FITBIT_AUTHORIZE_URL") {
        provider.authorize_url = url;
    }
    if let Some(url) = env.get("MEALSCRIBE_FITBIT_API_URL") {
        provider.api_base_url = url;
    }
    if let Some(secs) = env.parsed("MEALSCRIBE_TOKEN_LIFETIME_SECS")? {
        provider.token_lifetime_secs = secs;
    }

    let mut completion = CompletionConfig::new(env.required("MEALSCRIBE_OPENAI_API_KEY")?);
    if let Some(model) = env.get("MEALSCRIBE_OPENAI_MODEL") {
        completion.model = model;
    }
    if let Some(url) = env.get("MEALSCRIBE_OPENAI_API_URL") {
        completion.api_url = url;
    }
    if let Some(max_tokens) = env.parsed("MEALSCRIBE_OPENAI_MAX_TOKENS")? {
        completion.max_tokens = max_tokens;
    }
    if let Some(temperature) = env.parsed("MEALSCRIBE_OPENAI_TEMPERATURE")? {
        completion.temperature = temperature;
    }

    let mut http = HttpConfig::default();
    if let Some(secs) = env.parsed("MEALSCRIBE_HTTP_TIMEOUT_SECS")? {
        http.timeout_secs = secs;
    }
    if let Some(attempts) = env.parsed("MEALSCRIBE_HTTP_MAX_ATTEMPTS")? {
        http.max_attempts = attempts;
    }

    let mut storage = StorageConfig::default();
    if let Some(service) = env.get("MEALSCRIBE_KEYCHAIN_SERVICE") {
        storage.keychain_service = service;
    }

    Ok(Config { provider, completion, http, storage })
}

struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Value for `key`, treating blank values as unset
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| {
            MealscribeError::Config(format!("Missing required environment variable: {key}"))
        })
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| MealscribeError::Config(format!("Invalid value for {key}: {e}")))
            })
            .transpose()
    }
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `MealscribeError::Config` if the file is missing, unreadable or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MealscribeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MealscribeError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MealscribeError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MealscribeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MealscribeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MealscribeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
        dirs.push(cwd.join("../.."));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}
