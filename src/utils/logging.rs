//! Diagnostic logging setup.
//!
//! Logs go to stderr so transcript output on stdout stays clean, or to a
//! file when `--log` is given.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the filter: `RUST_LOG` when set, otherwise `fallback`.
pub fn build_filter(fallback: &str) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .map_err(|err| format!("Invalid log filter '{fallback}': {err}").into())
}

/// Install the global subscriber.
pub fn init_logging(
    fallback_filter: &str,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = build_filter(fallback_filter)?;
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let registry = tracing_subscriber::registry().with(filter);
    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(layer.with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => registry.with(layer.with_writer(std::io::stderr)).try_init(),
    };
    result.map_err(|err| format!("Failed to initialize logging: {err}").into())
}
