//! Session controller: the observable authentication state.
//!
//! The controller is the only writer of [`SessionState`]. Consumers take a
//! snapshot with [`SessionController::state`] or follow changes through
//! [`SessionController::subscribe`].

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, instrument, warn};

use modelmate_core::error::{AuthError, Error};
use modelmate_core::{AuthApi, Credentials, Navigator, Registration, TokenStore, UserProfile};

use crate::api::LOGIN_FAILED;

const PROFILE_UNAVAILABLE: &str = "Failed to get user data";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial state, until bootstrap settles.
    Bootstrapping,
    Anonymous,
    Authenticated,
}

/// A snapshot of the session.
///
/// Constructed only through the controller's transitions, so a logged-in
/// snapshot always carries a user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    phase: SessionPhase,
    user: Option<UserProfile>,
    loading: bool,
}

impl SessionState {
    fn bootstrapping() -> Self {
        Self {
            phase: SessionPhase::Bootstrapping,
            user: None,
            loading: true,
        }
    }

    fn anonymous() -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            user: None,
            loading: false,
        }
    }

    fn authenticated(user: UserProfile) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            user: Some(user),
            loading: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// True during bootstrap and while a login is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

/// Why a login did not produce an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// The server refused the credentials; carries its message.
    #[error("{0}")]
    Rejected(String),

    /// Tokens were issued and stored, but the profile could not be fetched.
    #[error("{}", PROFILE_UNAVAILABLE)]
    ProfileUnavailable,

    /// The token endpoint could not be reached or answered nonsense.
    #[error("{}", LOGIN_FAILED)]
    Unavailable,
}

/// Why a registration failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Field-keyed validation errors from the server.
    #[error("{}", render_fields(.0))]
    Fields(BTreeMap<String, Vec<String>>),

    #[error("{0}")]
    Message(String),
}

fn render_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The process-wide authentication state machine.
///
/// Cheap to clone; clones share state. Generic over the API so tests can
/// substitute the network.
pub struct SessionController<A> {
    inner: Arc<ControllerInner<A>>,
}

struct ControllerInner<A> {
    api: A,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    bootstrapped: OnceCell<()>,
}

impl<A> Clone for SessionController<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AuthApi> SessionController<A> {
    /// Create a controller in the bootstrapping state.
    ///
    /// Call [`bootstrap`](Self::bootstrap) to settle it, or use
    /// [`start`](Self::start) to do both.
    pub fn new(api: A, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(SessionState::bootstrapping());
        Self {
            inner: Arc::new(ControllerInner {
                api,
                store,
                navigator,
                state,
                bootstrapped: OnceCell::new(),
            }),
        }
    }

    /// Create a controller and run its bootstrap.
    pub async fn start(api: A, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        let controller = Self::new(api, store, navigator);
        controller.bootstrap().await;
        controller
    }

    /// Establish the initial session state. Runs at most once per controller;
    /// later calls wait for the first to finish.
    pub async fn bootstrap(&self) {
        self.inner
            .bootstrapped
            .get_or_init(|| self.run_bootstrap())
            .await;
    }

    #[instrument(skip(self))]
    async fn run_bootstrap(&self) {
        if !self.is_authenticated() {
            info!("No valid access token; anonymous session");
            self.publish(SessionState::anonymous());
            return;
        }

        match self.inner.api.current_user().await {
            Ok(profile) if profile.is_usable() => {
                info!(username = profile.username().unwrap_or_default(), "Session restored");
                self.publish(SessionState::authenticated(profile));
            }
            Ok(_) => {
                warn!("Current-user endpoint returned no usable profile");
                self.logout();
            }
            Err(e) if ended_by_gateway(&e) => {
                // The gateway has already requested sign-in.
                warn!(error = %e, "Session rejected by the server");
                self.inner.store.clear();
                self.publish(SessionState::anonymous());
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session");
                self.logout();
            }
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.borrow().is_logged_in()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Local check: is a decodable, unexpired access token stored?
    ///
    /// Clears the stored pair when the access token is present but expired or
    /// undecodable. Never touches the network.
    pub fn is_authenticated(&self) -> bool {
        let Some(access) = self.inner.store.get().access else {
            return false;
        };

        let valid = access.is_valid();
        if !valid {
            debug!("Stored access token expired or unreadable; clearing");
            self.inner.store.clear();
        }
        valid
    }

    /// Fetch the current user's profile.
    ///
    /// Failures are logged and yield `None`; a 401 that survives the
    /// gateway's refresh clears the stored pair.
    pub async fn current_user(&self) -> Option<UserProfile> {
        match self.inner.api.current_user().await {
            Ok(profile) if profile.is_usable() => Some(profile),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to get current user");
                if e.is_unauthorized() {
                    self.inner.store.clear();
                }
                None
            }
        }
    }

    /// Log in with a username and password.
    ///
    /// On success the returned profile is also published as the
    /// authenticated state. If the profile fetch fails after tokens were
    /// issued, the tokens stay stored and the state is left unchanged.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, LoginError> {
        let _loading = LoadingGuard::engage(&self.inner.state);

        let pair = match self.inner.api.obtain_tokens(credentials).await {
            Ok(pair) => pair,
            Err(Error::Auth(AuthError::InvalidCredentials(message))) => {
                info!(%message, "Login rejected");
                return Err(LoginError::Rejected(message));
            }
            Err(e) => {
                warn!(error = %e, "Login request failed");
                return Err(LoginError::Unavailable);
            }
        };

        self.inner.store.set(&pair);

        match self.inner.api.current_user().await {
            Ok(profile) if profile.is_usable() => {
                info!("Logged in");
                self.publish(SessionState::authenticated(profile.clone()));
                Ok(profile)
            }
            Ok(_) => {
                warn!("Current-user endpoint returned no usable profile");
                Err(LoginError::ProfileUnavailable)
            }
            Err(e) => {
                warn!(error = %e, "Failed to get user data after login");
                Err(LoginError::ProfileUnavailable)
            }
        }
    }

    /// Log out: clear credentials, reset to anonymous, go to sign-in.
    pub fn logout(&self) {
        info!("Logging out");
        self.inner.store.clear();
        self.publish(SessionState::anonymous());
        self.inner.navigator.redirect_to_sign_in();
    }

    /// Replace the profile of the authenticated user, e.g. after a settings
    /// change. Ignored when nobody is logged in.
    pub fn update_user(&self, profile: UserProfile) {
        let updated = self.inner.state.send_if_modified(|state| {
            if state.is_logged_in() {
                state.user = Some(profile);
                true
            } else {
                false
            }
        });

        if !updated {
            warn!("Ignoring profile update for anonymous session");
        }
    }

    /// Create a new account. Does not log in.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, RegisterError> {
        match self.inner.api.register(registration).await {
            Ok(profile) => {
                info!("Account created");
                Ok(profile)
            }
            // A `detail` body is a single message even though it is an object.
            Err(Error::Api(api)) => Err(match (api.detail(), api.field_errors()) {
                (None, Some(fields)) => RegisterError::Fields(fields),
                _ => RegisterError::Message(
                    api.message()
                        .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
                ),
            }),
            Err(e) => {
                warn!(error = %e, "Registration request failed");
                Err(RegisterError::Message(REGISTRATION_FAILED.to_string()))
            }
        }
    }

    fn publish(&self, state: SessionState) {
        debug!(phase = ?state.phase, "Session state changed");
        self.inner.state.send_replace(state);
    }
}

/// A 401 surviving the replay, or a failed refresh: the gateway has already
/// signed out.
fn ended_by_gateway(err: &Error) -> bool {
    err.is_unauthorized() || matches!(err, Error::Auth(_))
}

/// Sets `loading` for its lifetime; clears it on drop, including when a
/// login future is cancelled.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> LoadingGuard<'a> {
    fn engage(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| s.loading = true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

impl<A> std::fmt::Debug for SessionController<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
