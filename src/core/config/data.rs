use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::constants::DEFAULT_BASE_URL;
use crate::utils::url::normalize_base_url;

/// Environment variable that overrides the configured backend URL.
pub const BASE_URL_ENV: &str = "AGENTDESK_BASE_URL";

/// Log filter used when neither `RUST_LOG` nor `log_level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Backend API root (e.g., "http://localhost:8000/api")
    pub base_url: Option<String>,
    /// Stream assistant replies as they are generated
    pub stream: Option<bool>,
    /// Session cache file; defaults to `sessions.json` in the data directory
    pub cache_path: Option<PathBuf>,
    /// Tracing filter directive used when `RUST_LOG` is unset (e.g., "info", "agentdesk=debug")
    pub log_level: Option<String>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/agentdesk/config.toml` → `~/.config/agentdesk/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    /// Backend URL in precedence order: explicit flag, environment, config
    /// file, built-in default.
    pub fn resolve_base_url(&self, flag: Option<&str>) -> String {
        let env_value = std::env::var(BASE_URL_ENV).ok();
        self.resolve_base_url_with_env(flag, env_value.as_deref())
    }

    pub(crate) fn resolve_base_url_with_env(&self, flag: Option<&str>, env: Option<&str>) -> String {
        let chosen = [flag, env, self.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        normalize_base_url(chosen)
    }

    pub fn stream_enabled(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn log_filter(&self) -> &str {
        self.log_level
            .as_deref()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
