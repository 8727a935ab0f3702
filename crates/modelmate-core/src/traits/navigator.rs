//! Sign-in navigation trait.

/// Sends the user to the sign-in entry point.
///
/// Invoked on explicit logout and whenever the session ends involuntarily
/// (refresh failed, refreshed token rejected).
pub trait Navigator: Send + Sync {
    fn redirect_to_sign_in(&self);
}

/// A navigator with nowhere to go.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_sign_in(&self) {
        tracing::debug!("Sign-in redirect requested; no navigator installed");
    }
}
