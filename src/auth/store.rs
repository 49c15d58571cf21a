//! Token Store
//!
//! Persistent key-value storage for session credentials.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "token";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the cached user profile
pub const USER_KEY: &str = "user";

// == Token Store Boundary ==
/// Where the layer reads and writes session credentials.
///
/// Writes are fire-and-forget: an implementation that fails to persist logs
/// the failure rather than reporting it.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Replaces both tokens together.
    fn set_tokens(&self, access_token: &str, refresh_token: &str);

    /// Removes the access token, the refresh token and the cached user profile.
    fn clear_tokens(&self);
}

// == Local Store ==
/// String key-value store, optionally mirrored to a JSON file so it
/// survives restarts.
#[derive(Debug)]
pub struct LocalStore {
    items: Mutex<HashMap<String, String>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Opens the store persisted at `path`.
    ///
    /// A missing file yields an empty store. A file that cannot be read or
    /// parsed is logged and treated as empty; it is overwritten on the next
    /// write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load(&path).unwrap_or_default();
        debug!(path = %path.display(), entries = items.len(), "token store opened");
        Self {
            items: Mutex::new(items),
            path: Some(path),
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: impl Into<String>) {
        let mut items = self.lock();
        items.insert(key.to_string(), value.into());
        self.persist(&items);
    }

    pub fn remove_item(&self, key: &str) {
        let mut items = self.lock();
        if items.remove(key).is_some() {
            self.persist(&items);
        }
    }

    /// The cached user profile, if one was stored and is valid JSON.
    pub fn user_profile(&self) -> Option<Value> {
        self.get_item(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn set_user_profile(&self, profile: &Value) {
        self.set_item(USER_KEY, profile.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &HashMap<String, String>) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = save(path, items) {
            warn!(path = %path.display(), error = %err, "failed to persist token store");
        }
    }
}

impl TokenStore for LocalStore {
    fn access_token(&self) -> Option<String> {
        self.get_item(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get_item(REFRESH_TOKEN_KEY)
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        let mut items = self.lock();
        items.insert(ACCESS_TOKEN_KEY.to_string(), access_token.to_string());
        items.insert(REFRESH_TOKEN_KEY.to_string(), refresh_token.to_string());
        self.persist(&items);
    }

    fn clear_tokens(&self) {
        let mut items = self.lock();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            items.remove(key);
        }
        self.persist(&items);
    }
}

fn load(path: &Path) -> Option<HashMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read token store");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Some(items),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "token store is corrupt, starting empty");
            None
        }
    }
}

fn save(path: &Path, items: &HashMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(items)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_set_and_clear() {
        let store = LocalStore::in_memory();
        assert_eq!(store.access_token(), None);

        store.set_tokens("at-1", "rt-1");
        store.set_user_profile(&json!({"id": 7, "username": "ada"}));
        assert_eq!(store.access_token().as_deref(), Some("at-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("rt-1"));
        assert_eq!(store.user_profile(), Some(json!({"id": 7, "username": "ada"})));

        store.clear_tokens();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.user_profile(), None);
    }

    #[test]
    fn test_clear_keeps_unrelated_items() {
        let store = LocalStore::in_memory();
        store.set_item("theme", "dark");
        store.set_tokens("at", "rt");

        store.clear_tokens();

        assert_eq!(store.get_item("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = LocalStore::open(&path);
        store.set_tokens("at-1", "rt-1");
        drop(store);

        let reopened = LocalStore::open(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("at-1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("rt-1"));

        reopened.clear_tokens();
        let cleared = LocalStore::open(&path);
        assert_eq!(cleared.access_token(), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = LocalStore::open(&path);
        assert_eq!(store.access_token(), None);

        store.set_tokens("at", "rt");
        assert_eq!(LocalStore::open(&path).access_token().as_deref(), Some("at"));
    }

    #[test]
    fn test_invalid_profile_json_is_absent() {
        let store = LocalStore::in_memory();
        store.set_item(USER_KEY, "{broken");
        assert_eq!(store.user_profile(), None);
    }
}
