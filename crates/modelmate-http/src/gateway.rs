//! Authenticated request gateway.
//!
//! Every request goes out with the stored access token. When the API answers
//! 401, the gateway refreshes the access token and replays the request once.
//! Refreshes are single-flight: while one is outstanding, further 401s wait
//! on it instead of starting their own, and all of them are released together
//! when it settles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use modelmate_core::error::{AuthError, Error};
use modelmate_core::{AccessToken, ApiUrl, Navigator, Result, TokenStore};

use crate::client::{ApiRequest, ApiResponse, HttpClient};
use crate::config::ClientConfig;
use crate::endpoints::{RefreshRequest, TOKEN_REFRESH, TokenResponse};

type RefreshOutcome = std::result::Result<AccessToken, AuthError>;

/// The HTTP entry point for everything that talks to the REST API.
///
/// Cheap to clone; clones share the token store and the refresh state, so
/// one gateway should be created per session and handed to every consumer.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: HttpClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh_timeout: Option<Duration>,
    refresh: Mutex<RefreshState>,
}

/// Refresh coordination. `waiters` is non-empty only while `in_progress`.
#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

enum Ticket {
    Lead,
    Wait(oneshot::Receiver<RefreshOutcome>),
}

impl Gateway {
    /// Create a gateway for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(GatewayInner {
                http: HttpClient::new(config)?,
                store,
                navigator,
                refresh_timeout: config.refresh_timeout,
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }

    /// Returns the API base URL.
    pub fn api_url(&self) -> &ApiUrl {
        self.inner.http.api_url()
    }

    /// Returns the token store shared with the session controller.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Returns the navigator used on forced sign-out.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Returns true while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_refresh().in_progress
    }

    /// Number of requests waiting on the outstanding refresh.
    pub fn queued_requests(&self) -> usize {
        self.inner.lock_refresh().waiters.len()
    }

    /// Send an authenticated request.
    ///
    /// A 401 triggers one refresh-and-replay. A second 401 on the replayed
    /// request ends the session and is returned as-is. Every other failure is
    /// returned untouched.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut token = self.inner.store.get().access;
        let mut retried = false;

        loop {
            match self.inner.http.dispatch(request, token.as_ref()).await {
                Err(err) if err.is_unauthorized() && !retried => {
                    debug!("Access token rejected, refreshing");
                    retried = true;
                    token = Some(self.refresh().await?);
                }
                Err(err) if err.is_unauthorized() => {
                    warn!("Refreshed access token rejected");
                    if let Some(rejected) = &token {
                        self.inner.end_session_if_current(rejected);
                    }
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    /// Send a request without credentials and without refresh handling.
    ///
    /// Used for the token and registration endpoints, where a 401 means bad
    /// input rather than an expired session.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute_public(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.inner.http.dispatch(request, None).await
    }

    /// Authenticated GET, decoding the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(&ApiRequest::get(path)).await?.json()
    }

    /// Authenticated POST with a JSON body, decoding the JSON response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::post(path).with_json(body)?)
            .await?
            .json()
    }

    /// Authenticated PUT with a JSON body, decoding the JSON response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::put(path).with_json(body)?)
            .await?
            .json()
    }

    /// Authenticated PATCH with a JSON body, decoding the JSON response.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::patch(path).with_json(body)?)
            .await?
            .json()
    }

    /// Authenticated DELETE.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(&ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Obtain a fresh access token.
    ///
    /// Joins the outstanding refresh if there is one; otherwise starts one.
    /// On failure the stored credentials are cleared and the navigator is
    /// sent to sign-in before the error is returned.
    pub async fn refresh(&self) -> Result<AccessToken> {
        let ticket = {
            let mut state = self.inner.lock_refresh();
            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Ticket::Wait(rx)
            } else {
                state.in_progress = true;
                Ticket::Lead
            }
        };

        match ticket {
            Ticket::Wait(rx) => {
                debug!("Refresh already in flight, queued");
                // A dropped sender means the leading request was cancelled
                // before the refresh settled.
                let outcome = rx.await.unwrap_or_else(|_| {
                    Err(AuthError::RefreshFailed {
                        message: "refresh was abandoned".to_string(),
                    })
                });
                outcome.map_err(Error::from)
            }
            Ticket::Lead => {
                let guard = RefreshGuard {
                    inner: &self.inner,
                    settled: false,
                };
                let outcome = self.inner.run_refresh().await;
                guard.settle(&outcome);

                if outcome.is_err() {
                    self.inner.end_session();
                }
                outcome.map_err(Error::from)
            }
        }
    }
}

impl GatewayInner {
    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the in-progress flag and take every waiter, in one step.
    fn finish_refresh(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.lock_refresh();
        state.in_progress = false;
        std::mem::take(&mut state.waiters)
    }

    #[instrument(skip(self))]
    async fn run_refresh(&self) -> RefreshOutcome {
        let pair = self.store.get();
        let refresh_token = pair.refresh.clone().ok_or(AuthError::RefreshTokenMissing)?;

        info!("Refreshing access token");

        let request = ApiRequest::post(TOKEN_REFRESH)
            .with_json(&RefreshRequest {
                refresh: refresh_token.as_str(),
            })
            .map_err(refresh_failure)?;

        let call = self.http.dispatch(&request, None);
        let response = match self.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AuthError::RefreshTimedOut {
                    duration_ms: limit.as_millis() as u64,
                }
            })?,
            None => call.await,
        }
        .map_err(refresh_failure)?;

        let tokens: TokenResponse = response.json().map_err(refresh_failure)?;
        let rotated = pair.rotated(tokens.access, tokens.refresh);
        self.store.set(&rotated);

        debug!("Access token refreshed");
        rotated.access.ok_or(AuthError::RefreshFailed {
            message: "refresh produced no access token".to_string(),
        })
    }

    /// Forced sign-out for a replay whose token was rejected.
    ///
    /// Only acts while `rejected` is still the stored access token, so a
    /// burst of rejected replays signs out once and a pair stored since
    /// then survives. The check and the clear happen under the refresh lock.
    fn end_session_if_current(&self, rejected: &AccessToken) {
        {
            let _state = self.lock_refresh();
            if self.store.get().access.as_ref() != Some(rejected) {
                debug!("Rejected token already replaced; session left alone");
                return;
            }
            self.store.clear();
        }

        warn!("Session ended by the server; signing out");
        self.navigator.redirect_to_sign_in();
    }

    /// Forced sign-out: drop credentials and send the user to sign-in.
    fn end_session(&self) {
        warn!("Session ended by the server; signing out");
        self.store.clear();
        self.navigator.redirect_to_sign_in();
    }
}

fn refresh_failure(err: Error) -> AuthError {
    match err {
        Error::Api(api) => AuthError::RefreshRejected {
            status: api.status,
            message: api.message(),
        },
        Error::Auth(auth) => auth,
        other => AuthError::RefreshFailed {
            message: other.to_string(),
        },
    }
}

/// Releases the refresh state even if the leading request is dropped
/// mid-refresh; queued requests then observe a closed channel.
struct RefreshGuard<'a> {
    inner: &'a GatewayInner,
    settled: bool,
}

impl RefreshGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        let waiters = self.inner.finish_refresh();
        debug!(queued = waiters.len(), ok = outcome.is_ok(), "Releasing queued requests");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.inner.finish_refresh());
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("api_url", self.inner.http.api_url())
            .field("refreshing", &self.is_refreshing())
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
