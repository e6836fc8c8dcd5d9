//! Global `tracing` subscriber setup

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber at `level` (e.g. `"info"`, `"conv_classifier=debug"`).
///
/// `RUST_LOG`, when set, takes precedence over `level`. With `log_file` the
/// output goes to that file, without ANSI colours, instead of stderr.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Logging(format!("invalid log level '{level}': {e}")))?;

    let installed = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    installed.map_err(|e| Error::Logging(e.to_string()))
}
