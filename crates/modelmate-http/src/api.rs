//! REST implementation of the authentication API.

use async_trait::async_trait;
use tracing::{debug, instrument};

use modelmate_core::error::{AuthError, Error};
use modelmate_core::{AuthApi, Credentials, Registration, Result, TokenPair, UserProfile};

use crate::client::ApiRequest;
use crate::endpoints::{CURRENT_USER, REGISTER, TOKEN, TokenResponse};
use crate::gateway::Gateway;

/// Message used when the token endpoint rejects a login without saying why.
pub(crate) const LOGIN_FAILED: &str = "Login failed";

/// The authentication endpoints of the ModelMate REST API.
#[derive(Debug, Clone)]
pub struct RestAuthApi {
    gateway: Gateway,
}

impl RestAuthApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Returns the gateway used for authenticated calls.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

#[async_trait]
impl AuthApi for RestAuthApi {
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    async fn obtain_tokens(&self, credentials: &Credentials) -> Result<TokenPair> {
        let request = ApiRequest::post(TOKEN).with_json(credentials)?;

        let response = match self.gateway.execute_public(&request).await {
            Ok(response) => response,
            Err(Error::Api(api)) => {
                // Unlike `ApiError::message`, a bare `message` field is not
                // shown for a rejected login.
                let message = api
                    .detail()
                    .or_else(|| api.first_non_field_error())
                    .unwrap_or(LOGIN_FAILED)
                    .to_string();
                return Err(AuthError::InvalidCredentials(message).into());
            }
            Err(e) => return Err(e),
        };

        let tokens: TokenResponse = response.json()?;
        debug!(with_refresh = tokens.refresh.is_some(), "Token pair issued");
        Ok(TokenPair::new(tokens.access, tokens.refresh))
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<UserProfile> {
        self.gateway.get(CURRENT_USER).await
    }

    #[instrument(skip(self, registration), fields(username = %registration.username))]
    async fn register(&self, registration: &Registration) -> Result<UserProfile> {
        let request = ApiRequest::post(REGISTER).with_json(registration)?;
        self.gateway.execute_public(&request).await?.json()
    }
}
