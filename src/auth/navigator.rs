//! Login navigation boundary
//!
//! The only user-visible side effect the layer owns: sending the user to the
//! login entry point once their session cannot be recovered.

use tracing::warn;

/// Performs the client-side navigation to the login page.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, login_path: &str);
}

/// Navigator for headless hosts: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        warn!(login_path, "session expired, redirecting to login");
    }
}
