//! Setting handlers for the config keys.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, mutate_config, parse_bool};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::utils::url::normalize_base_url;

/// Data-driven handler for boolean (on/off) settings.
pub struct BooleanHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    set_field: fn(&mut Config, Option<bool>),
}

impl SettingHandler for BooleanHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        let set_field = self.set_field;
        mutate_config(ctx.config_path, |config| set_field(config, Some(value)))?;

        Ok(format!("✅ Set {} to: {}", self.key, format_bool(value)))
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;
        mutate_config(ctx.config_path, |config| set_field(config, None))?;

        Ok(format!(
            "✅ Unset {} (will use default: {})",
            self.key, self.default_display
        ))
    }
}

/// Data-driven handler for single-value text settings.
pub struct TextHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    /// Normalize the input or explain why it is rejected.
    validate: fn(&str) -> Result<String, String>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let value = (self.validate)(input.trim()).map_err(|reason| SettingError::InvalidValue {
            key: self.key,
            reason,
        })?;
        let message = format!("✅ Set {} to: {}", self.key, value);
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, Some(value)))?;

        Ok(message)
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;
        mutate_config(ctx.config_path, |config| set_field(config, None))?;
        Ok(format!("✅ Unset {} (will use default)", self.key))
    }
}

fn validate_base_url(input: &str) -> Result<String, String> {
    if input.starts_with("http://") || input.starts_with("https://") {
        Ok(normalize_base_url(input))
    } else {
        Err("expected an http:// or https:// URL".to_string())
    }
}

fn validate_log_level(input: &str) -> Result<String, String> {
    EnvFilter::try_new(input)
        .map(|_| input.to_string())
        .map_err(|err| err.to_string())
}

fn accept_any(input: &str) -> Result<String, String> {
    Ok(input.to_string())
}

/// Create a handler for the `stream` setting.
pub fn stream_handler() -> BooleanHandler {
    BooleanHandler {
        key: "stream",
        hint: "To choose streamed or buffered replies, specify on or off:",
        example: "agentdesk config set stream off",
        default_display: "on",
        set_field: |c, v| c.stream = v,
    }
}

/// Create a handler for the `base-url` setting.
pub fn base_url_handler() -> TextHandler {
    TextHandler {
        key: "base-url",
        hint: "To set the backend location, provide its API root:",
        example: "agentdesk config set base-url http://localhost:8000/api",
        validate: validate_base_url,
        set_field: |c, v| c.base_url = v,
    }
}

/// Create a handler for the `cache-path` setting.
pub fn cache_path_handler() -> TextHandler {
    TextHandler {
        key: "cache-path",
        hint: "To move the session cache, provide a file path:",
        example: "agentdesk config set cache-path ~/agentdesk/sessions.json",
        validate: accept_any,
        set_field: |c, v| c.cache_path = v.map(PathBuf::from),
    }
}

/// Create a handler for the `log-level` setting.
pub fn log_level_handler() -> TextHandler {
    TextHandler {
        key: "log-level",
        hint: "To change diagnostic logging, provide a level or filter directive:",
        example: "agentdesk config set log-level agentdesk=debug",
        validate: validate_log_level,
        set_field: |c, v| c.log_level = v,
    }
}
