//! Auth Module
//!
//! Session credential storage, single-flight token refresh, and the login
//! redirect boundary.

pub mod claims;
mod navigator;
mod refresh;
mod store;

pub use navigator::{LogNavigator, Navigator};
pub use refresh::{RefreshCoordinator, RefreshState};
pub use store::{LocalStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
