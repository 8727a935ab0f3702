//! Error types for the ModelMate client.
//!
//! A single [`Error`] type with explicit variants for transport,
//! authentication, API, storage and input validation failures.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Message used when a server error carries nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// The unified error type for ModelMate client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, undecodable body).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (bad credentials, failed refresh).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success responses from the REST API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Input validation errors (bad URL, undecodable token).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Token persistence errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns true when the server answered 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api(api) if api.is_unauthorized())
    }

    /// A message suitable for showing to a person.
    ///
    /// Server errors are reduced to their `detail`/`message` text; anything
    /// without readable text becomes [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(api) => api
                .message()
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            Error::Auth(auth) => auth.to_string(),
            Error::Transport(_) | Error::InvalidInput(_) | Error::Storage(_) => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Response body could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
///
/// Cloneable so that a single refresh outcome can be handed to every request
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token endpoint rejected the username/password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// No refresh token is stored.
    #[error("No refresh token available")]
    RefreshTokenMissing,

    /// The refresh endpoint rejected the refresh token.
    #[error("refresh rejected (HTTP {status}){}", message_suffix(.message))]
    RefreshRejected { status: u16, message: Option<String> },

    /// The refresh call failed before the server answered.
    #[error("refresh failed: {message}")]
    RefreshFailed { message: String },

    /// The refresh call did not settle within the configured bound.
    #[error("refresh timed out after {duration_ms}ms")]
    RefreshTimedOut { duration_ms: u64 },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// A non-success response from the REST API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON error body, if the server sent one.
    pub body: Option<Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(message) = self.message() {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Check if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Check if the server itself failed.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// The `detail` field of the error body.
    pub fn detail(&self) -> Option<&str> {
        self.body.as_ref()?.get("detail")?.as_str()
    }

    /// The first entry of `non_field_errors`.
    pub fn first_non_field_error(&self) -> Option<&str> {
        self.body
            .as_ref()?
            .get("non_field_errors")?
            .as_array()?
            .first()?
            .as_str()
    }

    /// Best human-readable message: `detail`, then `message`, then the first
    /// non-field error.
    pub fn message(&self) -> Option<String> {
        self.detail()
            .or_else(|| self.body.as_ref()?.get("message")?.as_str())
            .or_else(|| self.first_non_field_error())
            .map(str::to_string)
    }

    /// Field-keyed validation errors, as returned by form endpoints.
    ///
    /// Values that are strings become single-entry lists; other values are
    /// rendered as JSON text.
    pub fn field_errors(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let object = self.body.as_ref()?.as_object()?;
        let fields = object
            .iter()
            .map(|(field, value)| {
                let messages = match value {
                    Value::Array(items) => items.iter().map(render_message).collect(),
                    other => vec![render_message(other)],
                };
                (field.clone(), messages)
            })
            .collect::<BTreeMap<_, _>>();

        if fields.is_empty() { None } else { Some(fields) }
    }
}

fn render_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Token could not be decoded.
    #[error("invalid token: {reason}")]
    Token { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Token persistence errors.
///
/// Token stores log and swallow these; they surface only from the
/// lower-level `try_*` operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem or platform storage failure.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Stored value is not a valid credential pair.
    #[error("corrupt credential data: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            message: err.to_string(),
        }
    }
}
