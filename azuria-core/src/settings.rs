//! Startup configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. `API_URL` and `TOKEN` are mandatory and their absence is reported
//! through two distinct error variants so the operator knows which one to fix.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::Error;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PUSH_RECONNECT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token: String,
    pub api_key: String,
    pub push_url: String,
    pub base_dir: PathBuf,
    pub http_timeout: Duration,
    pub startup_timeout: Duration,
    pub push_reconnect_delay: Duration,
    /// Block startup until every command registration call has finished.
    pub await_registrations: bool,
}

impl Settings {
    /// Builds settings with defaults for everything but the two required values.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url = api_url.into();
        Self {
            push_url: api_url.clone(),
            api_url,
            token: token.into(),
            api_key: String::new(),
            base_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            push_reconnect_delay: Duration::from_secs(DEFAULT_PUSH_RECONNECT_SECS),
            await_registrations: false,
        }
    }

    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, Error> {
        load_env_file(None);
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every setting through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("API_URL").ok_or(Error::ApiUrlNotDefined)?;
        let token = get("TOKEN").ok_or(Error::TokenNotDefined)?;

        let mut settings = Settings::new(api_url.trim_end_matches('/'), token);

        if let Some(key) = get("API_KEY") {
            settings.api_key = key;
        }
        if let Some(push) = get("PUSH_URL") {
            settings.push_url = push.trim_end_matches('/').to_string();
        }
        if let Some(dir) = get("BASE_DIR") {
            settings.base_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("HTTP_TIMEOUT_SECS") {
            settings.http_timeout = parse_secs("HTTP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = get("STARTUP_TIMEOUT_SECS") {
            settings.startup_timeout = parse_secs("STARTUP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = get("PUSH_RECONNECT_SECS") {
            settings.push_reconnect_delay = parse_secs("PUSH_RECONNECT_SECS", &secs)?;
        }
        if let Some(flag) = get("AWAIT_REGISTRATIONS") {
            settings.await_registrations = parse_flag("AWAIT_REGISTRATIONS", &flag)?;
        }

        Ok(settings)
    }

    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn commands_dir(&self) -> PathBuf {
        self.base_dir.join("commands")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.base_dir.join("events")
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, Error> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::Parse(format!("{key}: expected whole seconds, got '{raw}' ({e})")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Parse(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

/// Loads `path` (or `.env` from the working directory and its parents) into
/// the process environment. Variables already set are left alone. Call it
/// before installing the log subscriber so `RUST_LOG` from the file applies.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenv::from_path(path).map(|_| path.to_path_buf()),
        None => dotenv::dotenv(),
    };
    match loaded {
        Ok(file) => {
            debug!("Loaded variables from {}", file.display());
            Some(file)
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_url_is_reported_first() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::ApiUrlNotDefined));

        let err = Settings::from_lookup(lookup(&[("TOKEN", "abc")])).unwrap_err();
        assert!(matches!(err, Error::ApiUrlNotDefined));
    }

    #[test]
    fn missing_token_is_distinct() {
        let err = Settings::from_lookup(lookup(&[("API_URL", "https://api.example.com")])).unwrap_err();
        assert!(matches!(err, Error::TokenNotDefined));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Settings::from_lookup(lookup(&[("API_URL", "https://x"), ("TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::TokenNotDefined));
    }

    #[test]
    fn defaults_and_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("API_URL", "https://api.example.com/"),
            ("TOKEN", "abc"),
            ("API_KEY", "key"),
            ("BASE_DIR", "/srv/bot"),
            ("HTTP_TIMEOUT_SECS", "3"),
            ("AWAIT_REGISTRATIONS", "yes"),
        ]))
        .unwrap();

        assert_eq!(settings.api_url, "https://api.example.com");
        assert_eq!(settings.push_url, "https://api.example.com");
        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.http_timeout, Duration::from_secs(3));
        assert_eq!(settings.startup_timeout, Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS));
        assert!(settings.await_registrations);
        assert_eq!(settings.commands_dir(), PathBuf::from("/srv/bot/commands"));
        assert_eq!(settings.events_dir(), PathBuf::from("/srv/bot/events"));
    }

    #[test]
    fn malformed_numbers_name_the_key() {
        let err = Settings::from_lookup(lookup(&[
            ("API_URL", "https://x"),
            ("TOKEN", "abc"),
            ("STARTUP_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        match err {
            Error::Parse(msg) => assert!(msg.contains("STARTUP_TIMEOUT_SECS")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_file_fills_the_process_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".env");
        std::fs::write(&file, "AZURIA_ENV_FILE_MARKER=from-file\n").unwrap();

        assert_eq!(load_env_file(Some(&file)), Some(file.clone()));
        assert_eq!(std::env::var("AZURIA_ENV_FILE_MARKER").as_deref(), Ok("from-file"));
        assert_eq!(load_env_file(Some(&dir.path().join("missing.env"))), None);
    }
}
