//! Client configuration.
//!
//! The base URL, credential and auth placement are fixed when the client is
//! built. `from_env` reads them from `GETRESPONSE_*` variables so binaries
//! and tests can be pointed at the mock server without code changes.

use std::time::Duration;

use crate::error::GetResponseError;

pub const DEFAULT_BASE_URL: &str = "https://api.getresponse.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the API key travels on each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// `X-Auth-Token: api-key <key>`
    #[default]
    Header,
    /// `?api_key=<key>`
    QueryParam,
}

impl std::str::FromStr for AuthMode {
    type Err = GetResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(AuthMode::Header),
            "query" | "query_param" | "query-param" => Ok(AuthMode::QueryParam),
            other => Err(GetResponseError::Config(format!(
                "unknown auth mode {other:?}, expected \"header\" or \"query\""
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub auth_mode: AuthMode,
    pub timeout: Duration,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            auth_mode: AuthMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a config from `GETRESPONSE_API_KEY` (required),
    /// `GETRESPONSE_BASE_URL`, `GETRESPONSE_AUTH_MODE` and
    /// `GETRESPONSE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, GetResponseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, GetResponseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GETRESPONSE_API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GetResponseError::Config("GETRESPONSE_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup("GETRESPONSE_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(mode) = lookup("GETRESPONSE_AUTH_MODE") {
            config = config.with_auth_mode(mode.parse()?);
        }
        if let Some(secs) = lookup("GETRESPONSE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                GetResponseError::Config(format!("GETRESPONSE_TIMEOUT_SECS is not a number: {secs:?}"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GetResponseError> {
        if self.api_key.is_empty() {
            return Err(GetResponseError::Config("api key is empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GetResponseError::Config(format!(
                "base url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(GetResponseError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}
