// Shared credential context. Every API client reads its auth headers from
// a `Session` and hands rotated headers back to it; the session owns the
// config store and persists each change.

use crate::config::{ConfigError, ConfigPatch, ConfigStore, Credentials};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to the single logged-in identity.
#[derive(Clone, Debug)]
pub struct Session {
    store: Arc<Mutex<ConfigStore>>,
}

impl Session {
    pub fn new(store: ConfigStore) -> Self {
        Session {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// A session that is never persisted. Mostly useful in tests.
    pub fn in_memory() -> Self {
        Self::new(ConfigStore::default())
    }

    fn lock(&self) -> MutexGuard<'_, ConfigStore> {
        // A panic while holding the lock cannot leave the config half-written.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current credentials, empty when nobody is logged in.
    pub fn credentials(&self) -> Credentials {
        self.lock().get().auth.clone().unwrap_or_default()
    }

    pub fn is_logged_in(&self) -> bool {
        !self.credentials().is_empty()
    }

    /// Replace the stored credentials unconditionally (last writer wins).
    pub fn rotate(&self, credentials: Credentials) -> Result<(), ConfigError> {
        self.lock().set(ConfigPatch::auth(credentials))
    }

    /// Replace the credentials only if they still equal `expected`.
    /// Returns whether the swap happened.
    pub fn compare_and_set(
        &self,
        expected: &Credentials,
        credentials: Credentials,
    ) -> Result<bool, ConfigError> {
        let mut store = self.lock();
        let current = store.get().auth.clone().unwrap_or_default();
        if &current != expected {
            return Ok(false);
        }
        store.set(ConfigPatch::auth(credentials))?;
        Ok(true)
    }

    /// Forget the stored credentials.
    pub fn clear(&self) -> Result<(), ConfigError> {
        self.lock().set(ConfigPatch::clear_auth())
    }
}
