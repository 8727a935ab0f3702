//! modelmate-core - Core types and traits for the ModelMate session client.
//!
//! The HTTP gateway and session controller live in `modelmate-http`; this
//! crate holds what they share: the credential pair, token types, the error
//! taxonomy and the traits at the storage, navigation and API seams.

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;
pub mod user;

pub use credentials::{Credentials, Registration};
pub use error::Error;
pub use jwt::TokenClaims;
pub use store::MemoryTokenStore;
pub use tokens::{AccessToken, RefreshToken, TokenPair};
pub use traits::{AuthApi, Navigator, NoopNavigator, TokenStore};
pub use types::ApiUrl;
pub use user::UserProfile;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
