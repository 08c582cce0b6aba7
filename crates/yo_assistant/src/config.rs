//! Provider configuration, read fresh before every exchange.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `~/.yosh/config.json` (optional, mode `0600`):
//!    `{"provider": "anthropic", "model": "...", "api_key": "...", "web_search": false}`.
//!    Unknown fields are rejected.
//! 2. `~/.yoshkey`, a single-line legacy key file (mode `0600`), used when the
//!    config file carries no `api_key`.
//! 3. `YO_PROVIDER`, `YO_MODEL`, `YO_HISTORY_LIMIT`, `YO_TOKEN_BUDGET` and
//!    `YO_WEB_SEARCH`.
//!
//! A key from `~/.yoshkey` is always an Anthropic key. `YO_CHAT_COLOR` is a
//! display setting and is read by [`chat_color`] when the host is built.

use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assist_provider::ProviderKind;
use conversation_store::{ConversationLimits, DEFAULT_HISTORY_LIMIT, DEFAULT_TOKEN_BUDGET};
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_DIR: &str = ".yosh";
pub const CONFIG_FILE: &str = "config.json";
pub const LEGACY_KEY_FILE: &str = ".yoshkey";

pub const PROVIDER_ENV: &str = "YO_PROVIDER";
pub const MODEL_ENV: &str = "YO_MODEL";
pub const HISTORY_LIMIT_ENV: &str = "YO_HISTORY_LIMIT";
pub const TOKEN_BUDGET_ENV: &str = "YO_TOKEN_BUDGET";
pub const WEB_SEARCH_ENV: &str = "YO_WEB_SEARCH";
pub const CHAT_COLOR_ENV: &str = "YO_CHAT_COLOR";

pub const DEFAULT_CHAT_COLOR: &str = "\x1b[3;36m";
const MIN_TOKEN_BUDGET: i64 = 100;
const REQUIRED_MODE: u32 = 0o600;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    web_search: Option<bool>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AssistConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub credential: String,
    pub web_search: bool,
    pub limits: ConversationLimits,
}

impl fmt::Debug for AssistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("credential", &"<redacted>")
            .field("web_search", &self.web_search)
            .field("limits", &self.limits)
            .finish()
    }
}

impl AssistConfig {
    /// Loads from the user's home directory and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Self::load_with(&home, &|key| std::env::var(key).ok())
    }

    /// Loads from `home` with `lookup` standing in for the environment.
    pub fn load_with(
        home: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config_path = home.join(CONFIG_DIR).join(CONFIG_FILE);
        let file = read_config_file(&config_path)?.unwrap_or_default();

        let requested = match env(PROVIDER_ENV).or(file.provider) {
            Some(name) => Some(
                name.parse::<ProviderKind>()
                    .map_err(|_| ConfigError::UnknownProvider(name.trim().to_string()))?,
            ),
            None => None,
        };

        let (credential, provider) = match file.api_key.map(|key| key.trim().to_string()) {
            Some(key) if !key.is_empty() => (key, requested.unwrap_or_default()),
            // The legacy key file only ever held an Anthropic key.
            _ => {
                let key = read_legacy_key(&home.join(LEGACY_KEY_FILE))?;
                match requested {
                    None | Some(ProviderKind::Anthropic) => (key, ProviderKind::Anthropic),
                    Some(other) => return Err(ConfigError::LegacyKeyProvider(other)),
                }
            }
        };

        let model = env(MODEL_ENV)
            .or(file.model)
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        let web_search = match env(WEB_SEARCH_ENV) {
            Some(value) => value.trim() == "1",
            None => file.web_search.unwrap_or(false),
        };

        let history_limit = env_int(&env, HISTORY_LIMIT_ENV)
            .filter(|limit| *limit >= 1)
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        let token_budget = env_int(&env, TOKEN_BUDGET_ENV)
            .filter(|budget| *budget >= MIN_TOKEN_BUDGET)
            .and_then(|budget| usize::try_from(budget).ok())
            .unwrap_or(DEFAULT_TOKEN_BUDGET);
        let limits = ConversationLimits::new(history_limit, token_budget).unwrap_or_default();

        let config = Self {
            provider,
            model,
            credential,
            web_search,
            limits,
        };
        debug!(provider = %config.provider, model = %config.model, "configuration loaded");
        Ok(config)
    }
}

/// Escape sequence for assistant text, from `YO_CHAT_COLOR`.
pub fn chat_color() -> String {
    chat_color_with(&|key| std::env::var(key).ok())
}

pub fn chat_color_with(lookup: &dyn Fn(&str) -> Option<String>) -> String {
    lookup(CHAT_COLOR_ENV)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CHAT_COLOR.to_string())
}

fn env_int(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<i64> {
    env(key).and_then(|value| value.trim().parse::<i64>().ok())
}

fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let Some(contents) = read_private(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn read_legacy_key(path: &Path) -> Result<String, ConfigError> {
    let contents = read_private(path)?.ok_or(ConfigError::MissingCredential)?;
    let key = contents.lines().next().unwrap_or("").trim();
    if key.is_empty() {
        return Err(ConfigError::EmptyCredential {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}

/// Reads a file that must only be accessible by its owner.
///
/// Returns `Ok(None)` when the file does not exist.
fn read_private(path: &Path) -> Result<Option<String>, ConfigError> {
    let read_error = |source: io::Error| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(read_error(error)),
    };
    let mode = metadata.permissions().mode() & 0o777;
    if mode != REQUIRED_MODE {
        return Err(ConfigError::Permissions {
            path: PathBuf::from(path),
            mode,
        });
    }
    fs::read_to_string(path).map(Some).map_err(read_error)
}
