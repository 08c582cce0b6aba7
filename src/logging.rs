//! File-backed tracing setup.
//!
//! The terminal belongs to the shell, so diagnostics only ever go to the file
//! named by `YO_LOG`. Without it no subscriber is installed and every
//! `tracing` macro is a no-op.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EnvConfig;

const DEFAULT_DIRECTIVE: &str = "info";

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber when the environment names a log file.
///
/// Returns `Ok(false)` when logging stays disabled.
pub fn init_from_env(config: &EnvConfig) -> io::Result<bool> {
    match config.log_path.as_deref() {
        Some(path) => init_file_logging(path, config.log_level.as_deref()).map(|()| true),
        None => Ok(false),
    }
}

/// Appends log records to `path`. Later calls are ignored once a subscriber is
/// installed.
pub fn init_file_logging(path: &Path, level: Option<&str>) -> io::Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let subscriber = build_subscriber(file, level);
    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;
    let _ = INSTALLED.set(());
    Ok(())
}

/// Builds the subscriber without installing it, so tests can scope it.
pub fn build_subscriber(
    log_file: File,
    level: Option<&str>,
) -> impl tracing::Subscriber + Send + Sync {
    let filter = level
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(filter)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn scoped_subscriber_writes_records_to_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("yosh.log");
        let file = File::create(&path).expect("log file should be created");

        let subscriber = build_subscriber(file, Some("debug"));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(bytes = 12, "scrollback append");
        });

        let written = fs::read_to_string(&path).expect("log file should be readable");
        assert!(written.contains("scrollback append"), "{written}");
        assert!(written.contains("bytes=12"), "{written}");
    }

    #[test]
    fn filter_level_suppresses_lower_records() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("yosh.log");
        let file = File::create(&path).expect("log file should be created");

        let subscriber = build_subscriber(file, Some("warn"));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hidden record");
            tracing::warn!("visible record");
        });

        let written = fs::read_to_string(&path).expect("log file should be readable");
        assert!(!written.contains("hidden record"));
        assert!(written.contains("visible record"));
    }

    #[test]
    fn disabled_without_log_path() {
        let config = EnvConfig::default();
        assert!(!init_from_env(&config).expect("no-op init should succeed"));
    }
}
