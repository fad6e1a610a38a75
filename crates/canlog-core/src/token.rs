//! Shared access token store.
//!
//! The token is process-wide: every request made through the
//! [`crate::ApiClient`] reads it at send time, so an edit takes effect on the
//! next request without rebuilding the client. Persistence is pluggable via
//! [`TokenPersistence`] and runs synchronously with each edit.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::Result;

/// Backing storage for the access token.
pub trait TokenPersistence: Send + Sync {
    /// Load the persisted token, if any.
    fn load(&self) -> Option<String>;

    /// Persist `token`. An empty string means "no token".
    fn store(&self, token: &str) -> std::io::Result<()>;
}

/// Persistence that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl TokenPersistence for NoPersistence {
    fn load(&self) -> Option<String> {
        None
    }

    fn store(&self, _token: &str) -> std::io::Result<()> {
        Ok(())
    }
}

/// Cloneable handle to the current access token.
#[derive(Clone)]
pub struct TokenStore {
    token: Arc<RwLock<String>>,
    persistence: Arc<dyn TokenPersistence>,
}

impl TokenStore {
    /// Create a store seeded from `persistence`.
    pub fn new(persistence: Arc<dyn TokenPersistence>) -> Self {
        let initial = persistence
            .load()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        Self {
            token: Arc::new(RwLock::new(initial)),
            persistence,
        }
    }

    /// Create an in-memory store holding `token`.
    pub fn in_memory(token: impl Into<String>) -> Self {
        let store = Self::new(Arc::new(NoPersistence));
        store.replace(token.into().trim());
        store
    }

    /// The current token, or `None` when empty.
    pub fn get(&self) -> Option<String> {
        let token = self.token.read().unwrap_or_else(|e| e.into_inner());
        if token.is_empty() {
            None
        } else {
            Some(token.clone())
        }
    }

    /// Replace the token (trimmed) and persist it.
    ///
    /// The new token is in effect even when persisting it fails.
    pub fn set(&self, token: &str) -> Result<()> {
        let trimmed = token.trim();
        self.replace(trimmed);
        if let Err(e) = self.persistence.store(trimmed) {
            warn!(error = %e, "Failed to persist access token");
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove the token.
    pub fn clear(&self) -> Result<()> {
        self.set("")
    }

    fn replace(&self, token: &str) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token.to_string();
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(Arc::new(NoPersistence))
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("token", &self.get().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPersistence {
        initial: Option<String>,
        stored: Mutex<Vec<String>>,
    }

    impl TokenPersistence for RecordingPersistence {
        fn load(&self) -> Option<String> {
            self.initial.clone()
        }

        fn store(&self, token: &str) -> std::io::Result<()> {
            self.stored.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_seeded_from_persistence() {
        let persistence = Arc::new(RecordingPersistence {
            initial: Some("  abc \n".to_string()),
            ..Default::default()
        });
        let store = TokenStore::new(persistence);
        assert_eq!(store.get().as_deref(), Some("abc"));
    }

    #[test]
    fn test_set_trims_and_persists() {
        let persistence = Arc::new(RecordingPersistence::default());
        let store = TokenStore::new(persistence.clone());
        assert_eq!(store.get(), None);

        store.set(" secret ").unwrap();
        assert_eq!(store.get().as_deref(), Some("secret"));

        store.clear().unwrap();
        assert_eq!(store.get(), None);

        let stored = persistence.stored.lock().unwrap();
        assert_eq!(*stored, vec!["secret".to_string(), String::new()]);
    }

    struct ReadOnlyPersistence;

    impl TokenPersistence for ReadOnlyPersistence {
        fn load(&self) -> Option<String> {
            Some("old".to_string())
        }

        fn store(&self, _token: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn test_persist_failure_is_io_error() {
        let store = TokenStore::new(Arc::new(ReadOnlyPersistence));
        let err = store.set("new").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("read-only"));
        // The edit still applies to this process.
        assert_eq!(store.get().as_deref(), Some("new"));
    }

    #[test]
    fn test_clones_share_token() {
        let store = TokenStore::in_memory("one");
        let other = store.clone();
        store.set("two").unwrap();
        assert_eq!(other.get().as_deref(), Some("two"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = TokenStore::in_memory("hunter2");
        let debug = format!("{:?}", store);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("redacted"));
    }
}
