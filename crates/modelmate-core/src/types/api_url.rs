//! API base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// A validated REST API base URL.
///
/// Must use HTTPS, or HTTP when the host is local. The base may carry a path
/// prefix (`https://example.com/api`); endpoint paths are joined beneath it.
///
/// # Example
///
/// ```
/// use modelmate_core::ApiUrl;
///
/// let api = ApiUrl::new("https://api.modelmate.dev/").unwrap();
/// assert_eq!(api.endpoint("/token/"), "https://api.modelmate.dev/token/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Create a new API URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not valid or doesn't meet requirements.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        Self::parse(s.as_ref(), false)
    }

    /// Like [`ApiUrl::new`], but also accepts plain HTTP to any host, such
    /// as a service name inside a container network.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute HTTP(S) URL.
    pub fn new_allowing_http(s: impl AsRef<str>) -> Result<Self, Error> {
        Self::parse(s.as_ref(), true)
    }

    fn parse(s: &str, allow_http: bool) -> Result<Self, Error> {
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s, allow_http)?;

        Ok(Self(url))
    }

    /// Returns the absolute URL of an endpoint path such as `/users/me/`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns true if the host is this machine.
    pub fn is_localhost(&self) -> bool {
        is_local_host(self.0.host_str())
    }

    fn validate(url: &Url, original: &str, allow_http: bool) -> Result<(), Error> {
        let reject = |reason: &str| -> Error {
            InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if url.cannot_be_a_base() {
            return Err(reject("must be an absolute URL"));
        }

        if url.host_str().is_none() {
            return Err(reject("must have a host"));
        }

        match url.scheme() {
            "https" => Ok(()),
            "http" if allow_http || is_local_host(url.host_str()) => Ok(()),
            _ => Err(reject("must use HTTPS (HTTP allowed only for localhost)")),
        }
    }
}

fn is_local_host(host: Option<&str>) -> bool {
    matches!(host, Some("localhost" | "127.0.0.1" | "[::1]"))
}

impl Default for ApiUrl {
    fn default() -> Self {
        Self(Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"))
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
