use crate::core::config::data::{path_display, Config, BASE_URL_ENV, DEFAULT_LOG_LEVEL};
use crate::core::constants::DEFAULT_BASE_URL;

impl Config {
    /// One indented `key: value` line per setting, noting defaults and overrides.
    pub(crate) fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.base_url {
            Some(url) => lines.push(format!("  base-url: {url}")),
            None => lines.push(format!("  base-url: (unset, default: {DEFAULT_BASE_URL})")),
        }
        if let Ok(value) = std::env::var(BASE_URL_ENV) {
            lines.push(format!("    overridden by {BASE_URL_ENV}={value}"));
        }
        match self.stream {
            Some(true) => lines.push("  stream: on".to_string()),
            Some(false) => lines.push("  stream: off".to_string()),
            None => lines.push("  stream: (unset, default: on)".to_string()),
        }
        match &self.cache_path {
            Some(path) => lines.push(format!("  cache-path: {}", path_display(path))),
            None => match self.session_cache_path() {
                Ok(path) => lines.push(format!("  cache-path: (unset, default: {})", path_display(path))),
                Err(_) => lines.push("  cache-path: (unset)".to_string()),
            },
        }
        match &self.log_level {
            Some(level) => lines.push(format!("  log-level: {level}")),
            None => lines.push(format!("  log-level: (unset, default: {DEFAULT_LOG_LEVEL})")),
        }
        lines
    }
}
