//! Traits at the storage, navigation and API seams.

mod auth_api;
mod navigator;
mod token_store;

pub use auth_api::AuthApi;
pub use navigator::{Navigator, NoopNavigator};
pub use token_store::TokenStore;
