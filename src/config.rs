//! Environment configuration for the relay and scrollback capture.

use std::env;
use std::path::PathBuf;

pub const SCROLLBACK_ENABLED_ENV: &str = "YO_SCROLLBACK_ENABLED";
pub const SCROLLBACK_BYTES_ENV: &str = "YO_SCROLLBACK_BYTES";
pub const SCROLLBACK_LINES_ENV: &str = "YO_SCROLLBACK_LINES";
pub const LOG_PATH_ENV: &str = "YO_LOG";
pub const LOG_LEVEL_ENV: &str = "YO_LOG_LEVEL";

pub const DEFAULT_SCROLLBACK_BYTES: usize = 1024 * 1024;
pub const DEFAULT_SCROLLBACK_LINES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// False only when `YO_SCROLLBACK_ENABLED` starts with `0`.
    pub scrollback_enabled: bool,
    pub scrollback_bytes: usize,
    pub scrollback_lines: usize,
    pub log_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            scrollback_enabled: true,
            scrollback_bytes: DEFAULT_SCROLLBACK_BYTES,
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            log_path: None,
            log_level: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scrollback_enabled: !env_disabled(SCROLLBACK_ENABLED_ENV),
            scrollback_bytes: env_positive(SCROLLBACK_BYTES_ENV)
                .unwrap_or(defaults.scrollback_bytes),
            scrollback_lines: env_positive(SCROLLBACK_LINES_ENV)
                .unwrap_or(defaults.scrollback_lines),
            log_path: env_string_opt(LOG_PATH_ENV).map(PathBuf::from),
            log_level: env_string_opt(LOG_LEVEL_ENV),
        }
    }

    #[must_use]
    pub fn with_scrollback_bytes(mut self, bytes: usize) -> Self {
        self.scrollback_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_scrollback_lines(mut self, lines: usize) -> Self {
        self.scrollback_lines = lines;
        self
    }
}

fn env_disabled(key: &str) -> bool {
    env::var(key)
        .map(|value| value.starts_with('0'))
        .unwrap_or(false)
}

fn env_positive(key: &str) -> Option<usize> {
    env_string_opt(key)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .and_then(|value| usize::try_from(value).ok())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
