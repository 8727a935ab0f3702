//! Token types for ModelMate authentication.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::jwt::{self, TokenClaims};

/// An access token for authenticated API requests.
///
/// Access tokens are short-lived JWTs issued by the token endpoint and sent
/// as `Authorization: Bearer <token>`.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Claims may be read locally, but are never modified
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    ///
    /// # Security
    ///
    /// Use only when constructing HTTP authorization headers or persisting
    /// the credential pair.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the token's claims without verifying its signature.
    pub fn claims(&self) -> Result<TokenClaims> {
        jwt::decode_claims(&self.0)
    }

    /// The `exp` claim as a timestamp, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims().ok()?.expires_at()
    }

    /// Returns true if the token decodes and its `exp` claim lies after `now`.
    ///
    /// Tokens without an `exp` claim are never considered valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| now < exp)
    }

    /// Returns true if the token is valid right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

// Hide token value in Debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A refresh token for obtaining new access tokens.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; it is only ever sent back to the refresh endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Create a new refresh token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in refresh requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Hide token value in Debug output
impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

/// The stored credential pair.
///
/// Serialized as `{"access": ..., "refresh": ...}` with `null` for absent
/// tokens. Pairs are always replaced wholesale, never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<AccessToken>,
    #[serde(default)]
    pub refresh: Option<RefreshToken>,
}

impl TokenPair {
    /// A pair holding both tokens.
    pub fn new(access: AccessToken, refresh: Option<RefreshToken>) -> Self {
        Self {
            access: Some(access),
            refresh,
        }
    }

    /// The pair with no tokens.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if neither token is present.
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// The pair that follows a successful refresh.
    ///
    /// The new access token always replaces the old one. The refresh token is
    /// replaced when the server rotated it and retained otherwise.
    pub fn rotated(&self, access: AccessToken, refresh: Option<RefreshToken>) -> Self {
        Self {
            access: Some(access),
            refresh: refresh.or_else(|| self.refresh.clone()),
        }
    }
}
