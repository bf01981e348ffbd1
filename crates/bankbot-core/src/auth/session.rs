use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::TokenStore;

/// Locale used when nothing else is configured
pub const DEFAULT_LOCALE: &str = "zh";

#[derive(Debug, Clone)]
struct SessionState {
    credential: String,
    locale: String,
}

/// Process-wide session: the current credential and the active locale.
///
/// Clone is cheap and every clone observes the same state. Readers must not
/// cache the credential across an `.await`; call [`Session::credential`]
/// again right before using it.
#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    store: Option<Arc<dyn TokenStore>>,
}

impl Session {
    /// Create an unauthenticated, memory-only session.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState {
                credential: String::new(),
                locale: locale.into(),
            })),
            store: None,
        }
    }

    /// Create a session backed by a durable store.
    ///
    /// Whatever the store holds at startup becomes the initial credential.
    /// An unreadable store is logged and treated as empty.
    pub fn with_store(store: Arc<dyn TokenStore>, locale: impl Into<String>) -> Self {
        let credential = match store.load() {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load stored credential");
                String::new()
            }
        };
        debug!(has_credential = !credential.is_empty(), "Session restored");

        Self {
            state: Arc::new(RwLock::new(SessionState {
                credential,
                locale: locale.into(),
            })),
            store: Some(store),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current credential, or an empty string when signed out.
    pub fn credential(&self) -> String {
        self.read().credential.clone()
    }

    /// Replace the credential unconditionally. No validation is done here.
    pub fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        // Store and memory change under the same lock so concurrent writers
        // cannot leave them disagreeing.
        let mut state = self.write();
        let persist = self.store.as_ref().map(|store| {
            if token.is_empty() {
                store.remove()
            } else {
                store.save(&token)
            }
        });
        state.credential = token;
        drop(state);

        if let Some(Err(e)) = persist {
            warn!(error = %e, "Failed to persist credential");
        }
    }

    pub fn clear_credential(&self) {
        self.set_credential(String::new());
    }

    /// Whether a credential is present. Derived, never stored separately.
    pub fn is_authenticated(&self) -> bool {
        !self.read().credential.is_empty()
    }

    pub fn locale(&self) -> String {
        self.read().locale.clone()
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        self.write().locale = locale.into();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use std::time::Duration;

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::default();
        assert_eq!(session.credential(), "");
        assert!(!session.is_authenticated());
        assert_eq!(session.locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn test_set_and_clear_credential() {
        let session = Session::default();
        session.set_credential("abc");
        assert_eq!(session.credential(), "abc");
        assert!(session.is_authenticated());

        session.clear_credential();
        assert_eq!(session.credential(), "");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::default();
        let other = session.clone();
        other.set_credential("shared");
        assert_eq!(session.credential(), "shared");
    }

    #[test]
    fn test_store_is_mirrored_and_written_through() {
        let store = Arc::new(MemoryTokenStore::with_token("persisted"));
        let session = Session::with_store(store.clone(), "en-US");
        assert_eq!(session.credential(), "persisted");

        session.set_credential("fresh");
        assert_eq!(store.load().unwrap().as_deref(), Some("fresh"));

        session.clear_credential();
        assert_eq!(store.load().unwrap(), None);
    }

    /// Saves immediately, then holds the caller for a while.
    struct LingeringStore {
        inner: MemoryTokenStore,
        linger: Duration,
    }

    impl TokenStore for LingeringStore {
        fn load(&self) -> anyhow::Result<Option<String>> {
            self.inner.load()
        }

        fn save(&self, token: &str) -> anyhow::Result<()> {
            self.inner.save(token)?;
            if token == "first" {
                std::thread::sleep(self.linger);
            }
            Ok(())
        }

        fn remove(&self) -> anyhow::Result<()> {
            self.inner.remove()
        }
    }

    #[test]
    fn test_concurrent_writers_keep_store_and_memory_in_step() {
        let store = Arc::new(LingeringStore {
            inner: MemoryTokenStore::new(),
            linger: Duration::from_millis(150),
        });
        let session = Session::with_store(store.clone(), "zh");

        let slow = {
            let session = session.clone();
            std::thread::spawn(move || session.set_credential("first"))
        };
        std::thread::sleep(Duration::from_millis(30));
        let fast = {
            let session = session.clone();
            std::thread::spawn(move || session.set_credential("second"))
        };
        slow.join().unwrap();
        fast.join().unwrap();

        let stored = store.load().unwrap().unwrap_or_default();
        assert_eq!(session.credential(), stored);
        assert_eq!(stored, "second");
    }

    #[test]
    fn test_locale_can_change() {
        let session = Session::new("zh");
        session.set_locale("en-US");
        assert_eq!(session.locale(), "en-US");
    }
}
