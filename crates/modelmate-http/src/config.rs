//! Client configuration.

use std::time::Duration;

use modelmate_core::{ApiUrl, Result};

/// Environment variable holding the API base URL.
pub const API_BASE_ENV: &str = "MODELMATE_API_BASE";

/// Upper bound on a refresh call unless configured otherwise.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every request the gateway sends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all endpoint paths are joined to.
    pub api_url: ApiUrl,
    pub user_agent: String,
    /// Per-request timeout. `None` waits as long as the connection lives.
    pub request_timeout: Option<Duration>,
    /// Bound on a refresh call. Requests queued behind a refresh wait at most
    /// this long. `None` waits indefinitely.
    pub refresh_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration for the given API with default settings.
    pub fn new(api_url: ApiUrl) -> Self {
        Self {
            api_url,
            user_agent: concat!("modelmate/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: None,
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
        }
    }

    /// Configuration from [`API_BASE_ENV`], falling back to the local
    /// development server.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set to an invalid URL.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_BASE_ENV) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::new(ApiUrl::new(value.trim())?)),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(ApiUrl::default())
    }
}
