use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use client_core::{ApiConfig, ConfigError};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "eventctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            request_timeout_secs: 10,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    cache_dir: Option<PathBuf>,
}

impl Settings {
    pub fn api_config(&self) -> Result<ApiConfig, ConfigError> {
        ApiConfig::with_timeout(
            &self.api_url,
            Duration::from_secs(self.request_timeout_secs),
        )
    }

    /// Explicit cache directory, or the platform cache dir.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("eventctl")))
    }

    fn apply_file(&mut self, raw: &str) -> Result<(), toml::de::Error> {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.api_url {
            self.api_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.cache_dir {
            self.cache_dir = Some(v);
        }
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("EVENTCTL_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("APP__API_URL") {
            self.api_url = v;
        }

        for key in ["EVENTCTL_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"] {
            if let Some(v) = var(key) {
                match v.parse::<u64>() {
                    Ok(parsed) => self.request_timeout_secs = parsed,
                    Err(_) => warn!(value = %v, key, "ignoring invalid request timeout"),
                }
            }
        }

        if let Some(v) = var("EVENTCTL_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("APP__CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
    }
}

/// Defaults, then the settings file (if present), then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Err(err) = settings.apply_file(&raw) {
            warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
