//! Authentication API trait.

use async_trait::async_trait;

use crate::{Credentials, Registration, Result, TokenPair, UserProfile};

/// The authentication endpoints the session controller drives.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a username and password for a credential pair.
    ///
    /// Rejected credentials surface as
    /// [`AuthError::InvalidCredentials`](crate::error::AuthError::InvalidCredentials)
    /// carrying the server's message.
    async fn obtain_tokens(&self, credentials: &Credentials) -> Result<TokenPair>;

    /// Fetch the profile of the user the stored access token belongs to.
    async fn current_user(&self) -> Result<UserProfile>;

    /// Create a new account.
    async fn register(&self, registration: &Registration) -> Result<UserProfile>;
}
