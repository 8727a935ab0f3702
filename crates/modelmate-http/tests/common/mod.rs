#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::json;
use wiremock::MockServer;

use modelmate_core::{
    AccessToken, ApiUrl, MemoryTokenStore, Navigator, RefreshToken, TokenPair, TokenStore,
};
use modelmate_http::{ClientConfig, Gateway, RestAuthApi, SessionController};

/// Navigator that counts sign-in redirects.
#[derive(Debug, Default)]
pub struct CountingNavigator {
    redirects: AtomicUsize,
}

impl CountingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn redirect_to_sign_in(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mint an unsigned JWT with the given expiry offset from now, in seconds.
pub fn jwt_expiring_in(seconds: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "token_type": "access",
            "exp": Utc::now().timestamp() + seconds,
            "user_id": 1
        })
        .to_string(),
    );
    format!("{}.{}.sig", header, payload)
}

pub fn pair(access: &str, refresh: Option<&str>) -> TokenPair {
    TokenPair::new(AccessToken::new(access), refresh.map(RefreshToken::new))
}

pub fn api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

pub struct Harness {
    pub gateway: Gateway,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<CountingNavigator>,
}

impl Harness {
    pub fn new(server: &MockServer, initial: TokenPair) -> Self {
        Self::with_config(ClientConfig::new(api_url(server)), initial)
    }

    pub fn with_refresh_timeout(server: &MockServer, initial: TokenPair, timeout: Duration) -> Self {
        Self::with_config(
            ClientConfig::new(api_url(server)).with_refresh_timeout(Some(timeout)),
            initial,
        )
    }

    fn with_config(config: ClientConfig, initial: TokenPair) -> Self {
        let store = Arc::new(MemoryTokenStore::with_pair(initial));
        let navigator = Arc::new(CountingNavigator::default());
        let gateway = Gateway::new(&config, store.clone(), navigator.clone()).unwrap();
        Self {
            gateway,
            store,
            navigator,
        }
    }

    pub fn stored(&self) -> TokenPair {
        self.store.get()
    }

    pub fn controller(&self) -> SessionController<RestAuthApi> {
        SessionController::new(
            RestAuthApi::new(self.gateway.clone()),
            self.store.clone(),
            self.navigator.clone(),
        )
    }
}
