//! Local JWT claim decoding.
//!
//! Claims are read without verifying the signature. The server remains the
//! source of truth; the local decode only answers "is this token worth
//! sending at all".

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::error::InvalidInputError;

/// Claims carried in the payload segment of an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, in epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issue time, in epoch seconds.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Subject user id. The API issues integers, but any JSON value is kept.
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Any other claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// The `exp` claim as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp?, 0)
    }
}

/// Decode the payload segment of a compact JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if segments.next().is_none() => payload,
        _ => return Err(invalid("expected three dot-separated segments")),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| invalid(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes).map_err(|e| invalid(format!("payload is not JSON: {}", e)))
}

fn invalid(reason: impl Into<String>) -> crate::Error {
    InvalidInputError::Token {
        reason: reason.into(),
    }
    .into()
}
