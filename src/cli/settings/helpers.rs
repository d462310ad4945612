//! Helper functions for settings operations.

use std::path::Path;

use crate::core::config::data::Config;

use super::error::SettingError;

/// Load the config at `path`, apply `f`, and save it back.
pub fn mutate_config<F>(path: &Path, f: F) -> Result<(), SettingError>
where
    F: FnOnce(&mut Config),
{
    let mut config =
        Config::load_from_path(path).map_err(|e| SettingError::ConfigError(e.to_string()))?;
    f(&mut config);
    config
        .save_to_path(path)
        .map_err(|e| SettingError::ConfigError(e.to_string()))
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Format a boolean value for display.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
