use modelmate_core::Navigator;

use crate::output;

/// Tells the user to sign in again when the session is ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_sign_in(&self) {
        output::hint("Session expired. Run 'modelmate login' to sign in again.");
    }
}
