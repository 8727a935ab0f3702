//! modelmate-http - Authenticated HTTP access to the ModelMate REST API.
//!
//! Three layers, leaves first:
//!
//! - [`Gateway`] sends requests with the stored bearer token and recovers
//!   from an expired access token by refreshing it once, no matter how many
//!   requests hit the expiry at the same time.
//! - [`RestAuthApi`] maps the token, refresh, current-user and registration
//!   endpoints onto [`AuthApi`](modelmate_core::AuthApi).
//! - [`SessionController`] owns the observable session state and drives
//!   bootstrap, login and logout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use modelmate_core::{Credentials, MemoryTokenStore, NoopNavigator};
//! use modelmate_http::{ClientConfig, Gateway, RestAuthApi, SessionController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryTokenStore::new());
//! let navigator = Arc::new(NoopNavigator);
//! let gateway = Gateway::new(&ClientConfig::from_env()?, store.clone(), navigator.clone())?;
//!
//! let session = SessionController::start(RestAuthApi::new(gateway.clone()), store, navigator).await;
//! if !session.is_logged_in() {
//!     session.login(&Credentials::new("alice", "hunter22")).await?;
//! }
//!
//! let models: serde_json::Value = gateway.get("/models/").await?;
//! println!("{}", models);
//! # Ok(())
//! # }
//! ```

mod api;
mod client;
mod config;
pub mod endpoints;
mod gateway;
mod session;

pub use api::RestAuthApi;
pub use client::{ApiRequest, ApiResponse, Method};
pub use config::{API_BASE_ENV, ClientConfig, DEFAULT_REFRESH_TIMEOUT};
pub use gateway::Gateway;
pub use session::{LoginError, RegisterError, SessionController, SessionPhase, SessionState};
