//! Current-user profile.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The payload returned by the current-user endpoint.
///
/// The client does not interpret the profile beyond checking that one exists;
/// the accessors below are conveniences for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Value);

impl UserProfile {
    /// Wrap a raw profile payload.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns true if the payload describes a user.
    ///
    /// `null` and payloads carrying an `error` key are not usable.
    pub fn is_usable(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::Object(map) => !map.contains_key("error"),
            _ => true,
        }
    }

    /// The `username` field, if present.
    pub fn username(&self) -> Option<&str> {
        self.0.get("username")?.as_str()
    }

    /// The `email` field, if present.
    pub fn email(&self) -> Option<&str> {
        self.0.get("email")?.as_str()
    }

    /// The `id` field, if present.
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// Returns the raw payload.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
