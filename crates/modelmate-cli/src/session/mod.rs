//! Wiring shared by every command: token file, gateway, session controller.

mod navigator;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use modelmate_core::ApiUrl;
use modelmate_file::FileTokenStore;
use modelmate_http::{ClientConfig, Gateway, RestAuthApi, SessionController};

use crate::cli::Cli;

pub use navigator::CliNavigator;

/// Per-invocation client state.
#[derive(Debug)]
pub struct Context {
    pub gateway: Gateway,
    pub store: Arc<FileTokenStore>,
    navigator: Arc<CliNavigator>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let api_url = match cli.api.as_deref() {
            Some(value) if cli.allow_http => {
                ApiUrl::new_allowing_http(value.trim()).context("Invalid API URL")?
            }
            Some(value) => ApiUrl::new(value.trim()).context("Invalid API URL")?,
            None => ApiUrl::default(),
        };

        let path = storage::token_path(cli.token_file.clone())?;
        let store = Arc::new(FileTokenStore::new(path));
        let navigator = Arc::new(CliNavigator);

        let config = ClientConfig::new(api_url)
            .with_user_agent(format!("modelmate-cli/{}", env!("MODELMATE_VERSION")));
        let gateway = Gateway::new(&config, store.clone(), navigator.clone())
            .context("Failed to create HTTP client")?;

        Ok(Self {
            gateway,
            store,
            navigator,
        })
    }

    /// A session controller sharing this context's gateway and store.
    /// Not bootstrapped.
    pub fn controller(&self) -> SessionController<RestAuthApi> {
        SessionController::new(
            RestAuthApi::new(self.gateway.clone()),
            self.store.clone(),
            self.navigator.clone(),
        )
    }
}
