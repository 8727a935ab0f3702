//! REST endpoint paths and request/response types.

use serde::{Deserialize, Serialize};

use modelmate_core::{AccessToken, RefreshToken};

/// Username/password exchange.
pub const TOKEN: &str = "/token/";

/// Access token refresh.
pub const TOKEN_REFRESH: &str = "/token/refresh/";

/// Profile of the authenticated user.
pub const CURRENT_USER: &str = "/users/me/";

/// Account creation.
pub const REGISTER: &str = "/auth/register/";

/// Request body for the refresh endpoint.
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response from the token and refresh endpoints.
///
/// The refresh endpoint only includes `refresh` when it rotates the token.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: AccessToken,
    #[serde(default)]
    pub refresh: Option<RefreshToken>,
}
