use std::collections::BTreeMap;
use std::time::Duration;

/// Overall wall-clock bound for one call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// How often the wait loop re-reads the cancel flag when no wake byte arrives.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// How the credential is attached to requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStyle {
    /// Raw key in a named header, e.g. `x-api-key`.
    ApiKeyHeader(String),
    /// `Authorization: Bearer <key>`.
    Bearer,
}

/// Transport configuration shared by every call of one engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub credential: String,
    pub auth: AuthStyle,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub cancel_check_interval: Duration,
}

impl EngineConfig {
    pub fn new(credential: impl Into<String>, auth: AuthStyle) -> Self {
        Self {
            credential: credential.into(),
            auth,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancel_check_interval(mut self, interval: Duration) -> Self {
        self.cancel_check_interval = interval;
        self
    }

    #[must_use]
    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
