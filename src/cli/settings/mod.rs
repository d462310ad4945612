//! Settings management for `agentdesk config set` and `agentdesk config unset`.
//!
//! Each key has a handler; boolean keys (`stream`) share [`handlers::BooleanHandler`]
//! and text keys (`base-url`, `cache-path`, `log-level`) share
//! [`handlers::TextHandler`] with a per-key validator.

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use std::path::Path;

/// Context provided to setting handlers during set/unset operations.
pub struct SetContext<'a> {
    pub config_path: &'a Path,
}

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the words after the key.
    ///
    /// Returns a success message to display.
    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Clear the configuration value so the default applies.
    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError>;
}

/// Apply `agentdesk config set <key> <value...>`.
pub fn set_setting(
    registry: &SettingRegistry,
    key: &str,
    args: &[String],
    ctx: &SetContext<'_>,
) -> Result<String, SettingError> {
    registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?
        .set(args, ctx)
}

/// Apply `agentdesk config unset <key>`.
pub fn unset_setting(
    registry: &SettingRegistry,
    key: &str,
    ctx: &SetContext<'_>,
) -> Result<String, SettingError> {
    registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?
        .unset(ctx)
}
